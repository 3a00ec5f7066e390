//! Core shared library for lokictx.
//!
//! This crate exposes the primitives the engine and the CLI depend on:
//! the run configuration, the canonical error types, local-time to
//! epoch-nanosecond conversion and logging setup.

pub mod config;
pub mod errors;
pub mod logging;
pub mod time;

pub use config::{ContextConfig, ContextErrorPolicy, ContextScope, PartialConfig, TimeZoneMode};
pub use errors::{ConfigError, LokiCtxError, Result as CoreResult};
pub use time::{to_epoch_nanos, QueryWindow};
