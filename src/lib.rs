//! lokictx: matched log lines with their surrounding context.
//!
//! Queries a Loki-compatible backend for lines matching a LogQL filter in a
//! time window, looks up the lines just before and after each match and
//! writes everything to a plain-text report.
//!
//! # Crates
//!
//! * `lokictx-core`: configuration, errors, time conversion, logging
//! * `lokictx-protocol`: `query_range` request and response types
//! * `lokictx-engine`: HTTP client, context lookup, report writer, pipeline
//! * `lokictx-cli`: the `lokictx` binary

pub use lokictx_core;
pub use lokictx_engine;
pub use lokictx_protocol;

pub use lokictx_core::{ContextConfig, ContextErrorPolicy, ContextScope, TimeZoneMode};
pub use lokictx_engine::{run, LogSource, LokiClient, RunSummary};
