use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;
use url::Url;

use crate::errors::{ConfigError, Result};
use crate::time::QueryWindow;

pub const DEFAULT_LOKI_URL: &str = "http://localhost:3100";
pub const DEFAULT_CONTEXT_LINES: u32 = 5;
pub const DEFAULT_OUTPUT: &str = "logs_with_context.txt";
pub const DEFAULT_LIMIT: u32 = 1000;

/// How the configured wall-clock timestamps are anchored to an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneMode {
    /// The zone of the machine running the tool.
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl FromStr for TimeZoneMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(TimeZoneMode::Local),
            "utc" | "z" => Ok(TimeZoneMode::Utc),
            other => parse_fixed_offset(other).map(TimeZoneMode::Fixed),
        }
    }
}

impl fmt::Display for TimeZoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneMode::Local => write!(f, "local"),
            TimeZoneMode::Utc => write!(f, "utc"),
            TimeZoneMode::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn parse_fixed_offset(raw: &str) -> std::result::Result<FixedOffset, ConfigError> {
    let invalid = || {
        ConfigError::invalid(
            "timezone",
            format!("expected 'local', 'utc' or an offset like +07:00, got '{raw}'"),
        )
    };

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let digits = |part: &str| -> std::result::Result<i32, ConfigError> {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        part.parse().map_err(|_| invalid())
    };
    let hours = digits(hours)?;
    let minutes = digits(minutes)?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Which selector the context queries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextScope {
    /// Reuse the configured filter expression verbatim.
    #[default]
    Filter,
    /// Narrow to the exact label set of the matched stream.
    Stream,
}

impl FromStr for ContextScope {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "filter" | "query" => Ok(ContextScope::Filter),
            "stream" | "labels" => Ok(ContextScope::Stream),
            other => Err(ConfigError::invalid(
                "context_scope",
                format!("expected 'filter' or 'stream', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextScope::Filter => write!(f, "filter"),
            ContextScope::Stream => write!(f, "stream"),
        }
    }
}

/// What happens when a context fetch for one matched line fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextErrorPolicy {
    /// Stop the run; blocks already written stay on disk.
    #[default]
    Abort,
    /// Log the failure and keep going with the next matched line.
    Skip,
}

impl FromStr for ContextErrorPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" | "fail" => Ok(ContextErrorPolicy::Abort),
            "skip" | "continue" => Ok(ContextErrorPolicy::Skip),
            other => Err(ConfigError::invalid(
                "on_context_error",
                format!("expected 'abort' or 'skip', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for ContextErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextErrorPolicy::Abort => write!(f, "abort"),
            ContextErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Fully resolved settings for one run. Built once at startup.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub loki_url: Url,
    pub query: String,
    pub start: String,
    pub end: String,
    pub timezone: TimeZoneMode,
    pub context_lines: u32,
    pub output: PathBuf,
    pub limit: u32,
    pub context_scope: ContextScope,
    pub on_context_error: ContextErrorPolicy,
    pub context_concurrency: usize,
    pub timeout: Option<Duration>,
    pub org_id: Option<String>,
}

impl ContextConfig {
    /// Builds a config with the required settings and defaults for the rest.
    pub fn new(loki_url: Url, query: &str, start: &str, end: &str) -> Self {
        Self {
            loki_url,
            query: query.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            timezone: TimeZoneMode::default(),
            context_lines: DEFAULT_CONTEXT_LINES,
            output: PathBuf::from(DEFAULT_OUTPUT),
            limit: DEFAULT_LIMIT,
            context_scope: ContextScope::default(),
            on_context_error: ContextErrorPolicy::default(),
            context_concurrency: 1,
            timeout: None,
            org_id: None,
        }
    }

    /// Converts the configured start/end strings into epoch nanoseconds.
    pub fn window(&self) -> Result<QueryWindow> {
        QueryWindow::parse(&self.start, &self.end, self.timezone)
    }
}

/// Settings from a single source (file, environment, flags). Every field
/// is optional so sources can be layered.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub loki_url: Option<String>,
    pub query: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub timezone: Option<String>,
    pub context_lines: Option<u32>,
    pub output: Option<PathBuf>,
    pub limit: Option<u32>,
    pub context_scope: Option<String>,
    pub on_context_error: Option<String>,
    pub context_concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub org_id: Option<String>,
}

impl PartialConfig {
    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|err| ConfigError::File {
            path: "<inline>".into(),
            reason: err.to_string(),
        })
    }

    pub fn from_toml_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let file_error = |reason: String| ConfigError::File {
            path: path.display().to_string(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|err| file_error(err.to_string()))?;
        toml::from_str(&raw).map_err(|err| file_error(err.to_string()))
    }

    /// Layers `higher` on top of `self`; set fields in `higher` win.
    pub fn overlay(self, higher: PartialConfig) -> PartialConfig {
        PartialConfig {
            loki_url: higher.loki_url.or(self.loki_url),
            query: higher.query.or(self.query),
            start: higher.start.or(self.start),
            end: higher.end.or(self.end),
            timezone: higher.timezone.or(self.timezone),
            context_lines: higher.context_lines.or(self.context_lines),
            output: higher.output.or(self.output),
            limit: higher.limit.or(self.limit),
            context_scope: higher.context_scope.or(self.context_scope),
            on_context_error: higher.on_context_error.or(self.on_context_error),
            context_concurrency: higher.context_concurrency.or(self.context_concurrency),
            timeout_secs: higher.timeout_secs.or(self.timeout_secs),
            org_id: higher.org_id.or(self.org_id),
        }
    }

    /// Validates the layered settings and fills in defaults.
    pub fn into_config(self) -> std::result::Result<ContextConfig, ConfigError> {
        let raw_url = self
            .loki_url
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOKI_URL.to_string());
        let loki_url = Url::parse(raw_url.trim())
            .map_err(|err| ConfigError::invalid("loki_url", format!("{raw_url}: {err}")))?;
        if !matches!(loki_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "loki_url",
                format!("unsupported scheme '{}'", loki_url.scheme()),
            ));
        }

        let query = required(self.query, "query")?;
        let start = required(self.start, "start")?;
        let end = required(self.end, "end")?;

        let timezone = self
            .timezone
            .as_deref()
            .map(str::parse::<TimeZoneMode>)
            .transpose()?
            .unwrap_or_default();
        let context_scope = self
            .context_scope
            .as_deref()
            .map(str::parse::<ContextScope>)
            .transpose()?
            .unwrap_or_default();
        let on_context_error = self
            .on_context_error
            .as_deref()
            .map(str::parse::<ContextErrorPolicy>)
            .transpose()?
            .unwrap_or_default();

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(ConfigError::invalid("limit", "must be at least 1"));
        }

        let context_concurrency = self.context_concurrency.unwrap_or(1);
        if context_concurrency == 0 {
            return Err(ConfigError::invalid(
                "context_concurrency",
                "must be at least 1",
            ));
        }

        let timeout = match self.timeout_secs {
            Some(0) => {
                return Err(ConfigError::invalid(
                    "timeout_secs",
                    "must be positive; omit it to disable the timeout",
                ))
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let org_id = self
            .org_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(ContextConfig {
            loki_url,
            query,
            start,
            end,
            timezone,
            context_lines: self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES),
            output: self
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            limit,
            context_scope,
            on_context_error,
            context_concurrency,
            timeout,
            org_id,
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> std::result::Result<String, ConfigError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingValue(key))
}
