// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (to stderr, so stdout only carries the report)
// 3. Load the config and validate the seed URL
// 4. Run the crawl and build the report
// 5. Exit with proper code (0 = no broken links, 1 = broken links, 2 = error)
//
// Rust concepts used:
// - async/await: The crawl runs many fetches concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - anyhow::Context: Adds a human-readable message to an error
// =============================================================================

// Module declarations - tells Rust about our other source files
mod checker; // src/checker/ - fetching pages and extracting links
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - crawl configuration
mod crawl; // src/crawl/ - the concurrent crawl engine
mod report; // src/report.rs - report building and rendering

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::Config;
use crawl::Crawler;
use report::Report;
use tracing::info;
use tracing_subscriber::EnvFilter;

// The #[tokio::main] attribute transforms our async main into a real main function
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins when set, otherwise --verbose picks debug over info
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// The main application logic
// Returns:
//   Ok(0) = no broken links (or graceful_exit is set)
//   Ok(1) = broken links found
//   Err   = the crawl could not be started
async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;

    let crawler = Crawler::new(&cli.url, config.clone())?;
    info!(url = %cli.url, domain = crawler.seed_domain(), "scanning website");

    let summary = crawler.run().await;
    let report = report::build(
        summary.checked,
        &summary.mailto,
        &summary.broken,
        &config.ok_status_codes,
    );

    write_report(&report, &cli)?;

    if report.has_broken() && !config.graceful_exit {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Config file first, then the CLI overrides on top, then one validation
// of the result (so --workers 8 can fix "threads": 0 from the file)
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.fetch_timeout_secs = timeout;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// Prints the report (or writes it to --output) as text or JSON
fn write_report(report: &Report, cli: &Cli) -> Result<()> {
    let rendered = if cli.json {
        serde_json::to_string_pretty(report)?
    } else {
        report.to_string()
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(["link-sentry", "https://example.com"].iter().chain(args)).unwrap()
    }

    #[test]
    fn test_cli_overrides_fix_invalid_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"threads": 0, "timeout": 0}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let config = load_config(&cli(&["--config", path, "--workers", "8", "--timeout", "15"])).unwrap();
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.fetch_timeout_secs, 15);
    }

    #[test]
    fn test_invalid_values_rejected_after_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"threads": 0}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        assert!(load_config(&cli(&["--config", path])).is_err());
        assert!(load_config(&cli(&["--workers", "0"])).is_err());
        assert!(load_config(&cli(&["--workers", "3"])).is_ok());
    }
}
