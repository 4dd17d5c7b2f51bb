// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Usage:
//   link-sentry https://example.com
//   link-sentry https://example.com --config hydra.json --workers 20
//   link-sentry https://example.com --json --output report.json
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "link-sentry",
    version,
    about = "Crawl a website and report its broken links",
    long_about = "link-sentry starts at the given URL, follows every link on the same domain \
                  and checks every link it finds (including links to other sites). \
                  It exits with code 1 when broken links were found, which makes it easy \
                  to use in CI pipelines."
)]
pub struct Cli {
    /// Website URL to crawl (e.g., https://example.com)
    ///
    /// Only pages on this URL's domain are searched for more links
    pub url: String,

    /// JSON config file overriding the defaults
    ///
    /// Keys: tags, attrs, exclude_scheme_prefixes, threads, timeout, OK, graceful_exit
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Number of concurrent workers (overrides "threads" from the config)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seconds to wait for each response (overrides "timeout" from the config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output the report as JSON instead of the text format
    #[arg(long)]
    pub json: bool,

    /// Write the report to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Log every fetch (same as RUST_LOG=debug)
    #[arg(long, short)]
    pub verbose: bool,
}
