use colored::*;
use lokictx_core::{ContextConfig, QueryWindow};
use lokictx_engine::RunSummary;

pub fn print_no_results(summary: &RunSummary) {
    println!("{}", "✘ No log lines matched the query.".yellow().bold());
    println!("  Report: {}", summary.output.display());
}

pub fn print_summary(summary: &RunSummary) {
    println!(
        "{} {}",
        "✔ Logs with context saved to".green().bold(),
        summary.output.display().to_string().bold()
    );
    println!("  Matched lines: {}", summary.matched);
    println!("  Context lines: {}", summary.context_lines);
    if summary.skipped_contexts > 0 {
        println!(
            "  {} {}",
            "Context lookups skipped:".yellow(),
            summary.skipped_contexts
        );
    }
    if summary.possibly_truncated {
        println!(
            "  {}",
            "Result hit the query limit; later matches are missing.".yellow()
        );
    }
}

pub fn print_dry_run(config: &ContextConfig, window: &QueryWindow) {
    println!("{}", "Resolved configuration".bold());
    println!("  Loki URL:       {}", config.loki_url);
    println!("  Query:          {}", config.query);
    println!(
        "  Window:         {} .. {} ({})",
        config.start, config.end, config.timezone
    );
    println!("  Window (ns):    {} .. {}", window.start, window.end);
    println!("  Limit:          {}", config.limit);
    println!("  Context lines:  {}", config.context_lines);
    println!("  Context scope:  {}", config.context_scope);
    println!("  On ctx error:   {}", config.on_context_error);
    println!("  Concurrency:    {}", config.context_concurrency);
    match config.timeout {
        Some(timeout) => println!("  Timeout:        {}s", timeout.as_secs()),
        None => println!("  Timeout:        none"),
    }
    if let Some(org_id) = &config.org_id {
        println!("  Org ID:         {org_id}");
    }
    println!("  Output:         {}", config.output.display());
}
