use std::path::{Path, PathBuf};

use clap::Args;
use lokictx_core::{ConfigError, ContextConfig, PartialConfig};
use tracing::debug;

/// Run settings accepted as flags or environment variables. Anything left
/// unset falls back to the config file, then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Base URL of the Loki backend
    #[arg(long, env = "LOKICTX_URL")]
    pub loki_url: Option<String>,
    /// LogQL filter expression, e.g. '{app="my-app"} |= "exception"'
    #[arg(short, long, env = "LOKICTX_QUERY")]
    pub query: Option<String>,
    /// Window start, "YYYY-MM-DD HH:MM:SS"
    #[arg(long, env = "LOKICTX_START")]
    pub start: Option<String>,
    /// Window end, "YYYY-MM-DD HH:MM:SS"
    #[arg(long, env = "LOKICTX_END")]
    pub end: Option<String>,
    /// Zone for --start/--end: local, utc or an offset like +07:00
    #[arg(long, env = "LOKICTX_TIMEZONE")]
    pub timezone: Option<String>,
    /// Lines fetched before and after every match
    #[arg(short = 'n', long, env = "LOKICTX_CONTEXT_LINES")]
    pub context_lines: Option<u32>,
    /// Report file, overwritten on every run
    #[arg(short, long, env = "LOKICTX_OUTPUT")]
    pub output: Option<PathBuf>,
    /// Maximum number of matches requested from the backend
    #[arg(long, env = "LOKICTX_LIMIT")]
    pub limit: Option<u32>,
    /// Context selector: filter (reuse the query) or stream (matched labels)
    #[arg(long, env = "LOKICTX_CONTEXT_SCOPE")]
    pub context_scope: Option<String>,
    /// On a failed context lookup: abort or skip
    #[arg(long, env = "LOKICTX_ON_CONTEXT_ERROR")]
    pub on_context_error: Option<String>,
    /// Context lookups in flight at once
    #[arg(long, env = "LOKICTX_CONTEXT_CONCURRENCY")]
    pub context_concurrency: Option<usize>,
    /// Per-request timeout in seconds; no timeout when unset
    #[arg(long, env = "LOKICTX_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
    /// Tenant sent as X-Scope-OrgID
    #[arg(long, env = "LOKICTX_ORG_ID")]
    pub org_id: Option<String>,
}

impl From<&QueryArgs> for PartialConfig {
    fn from(args: &QueryArgs) -> Self {
        PartialConfig {
            loki_url: args.loki_url.clone(),
            query: args.query.clone(),
            start: args.start.clone(),
            end: args.end.clone(),
            timezone: args.timezone.clone(),
            context_lines: args.context_lines,
            output: args.output.clone(),
            limit: args.limit,
            context_scope: args.context_scope.clone(),
            on_context_error: args.on_context_error.clone(),
            context_concurrency: args.context_concurrency,
            timeout_secs: args.timeout_secs,
            org_id: args.org_id.clone(),
        }
    }
}

/// Default config file location: `<config dir>/lokictx/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lokictx").join("config.toml"))
}

/// Layers flags/env over the config file and validates the result.
///
/// An explicitly named file must exist; the default one is optional.
pub fn resolve(config_path: Option<&Path>, args: &QueryArgs) -> Result<ContextConfig, ConfigError> {
    let file = match config_path {
        Some(path) => PartialConfig::from_toml_file(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "loading default config file");
                PartialConfig::from_toml_file(&path)?
            }
            None => PartialConfig::default(),
        },
    };

    file.overlay(PartialConfig::from(args)).into_config()
}
