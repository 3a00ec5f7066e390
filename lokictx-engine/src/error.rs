use std::io;
use std::path::PathBuf;

use lokictx_core::LokiCtxError;
use thiserror::Error;

use crate::client::ClientError;

/// Errors that abort a lokictx run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Core(#[from] LokiCtxError),
    #[error("backend returned an invalid entry timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("failed to write report {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
