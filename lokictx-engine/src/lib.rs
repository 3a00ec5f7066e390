//! lokictx engine - range queries, context lookup and report writing.

pub mod client;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod report;

pub use client::{ClientError, LogSource, LokiClient, ORG_ID_HEADER};
pub use context::{ContextDirection, ContextFetcher, ContextLine, MatchedLine};
pub use error::EngineError;
pub use pipeline::{run, RunSummary};
pub use report::{ReportWriter, CONTEXT_UNAVAILABLE_TAG, MATCH_HEADER, NO_RESULTS_MARKER};
