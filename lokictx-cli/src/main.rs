use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lokictx_core::logging;
use lokictx_engine::LokiClient;

mod console;
mod settings;

use settings::QueryArgs;

#[derive(Parser)]
#[command(name = "lokictx")]
#[command(about = "Fetch matching log lines and their surrounding context from Loki", long_about = None)]
struct Cli {
    /// TOML file with default settings
    #[arg(long, env = "LOKICTX_CONFIG")]
    config: Option<PathBuf>,
    /// Log level when RUST_LOG is unset
    #[arg(long, env = "LOKICTX_LOG_LEVEL")]
    log_level: Option<String>,
    /// Print the resolved settings and query window, then exit
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[command(flatten)]
    query: QueryArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("lokictx v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if let Err(err) = logging::init_tracing(cli.log_level.as_deref()) {
        eprintln!("⚠️ failed to initialise tracing: {err}");
    }

    let config = settings::resolve(cli.config.as_deref(), &cli.query)
        .context("invalid configuration")?;

    if cli.dry_run {
        let window = config.window()?;
        console::print_dry_run(&config, &window);
        return Ok(());
    }

    let client = LokiClient::from_config(&config)?;
    let summary = lokictx_engine::run(&config, &client).await?;

    if summary.no_results {
        console::print_no_results(&summary);
    } else {
        console::print_summary(&summary);
    }

    Ok(())
}
