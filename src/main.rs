//! # pushshift_dump
//!
//! Downloads every submission of one subreddit from a Pushshift-compatible
//! search API and stores it as gzip-compressed newline-delimited JSON.
//!
//! ## Usage
//!
//! ```sh
//! pushshift_dump rust rust.ndjson.gz --after 1600000000 --before 1700000000
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: CLI flags, env and an optional YAML file resolve
//!    into one [`config::ScrapeConfig`]
//! 2. **Paging**: [`pagination::download_posts`] walks the time range one
//!    500-post page at a time, yielding posts lazily
//! 3. **Output**: [`outputs::ndjson::write_posts`] compresses each post into
//!    the dump file as it arrives
//!
//! Everything runs on a single thread with one request in flight.

use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pagination;
mod utils;

use api::PushshiftClient;
use cli::Cli;
use config::ScrapeConfig;
use outputs::ndjson;
use pagination::download_posts;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "pushshift_dump starting up");

    let config = ScrapeConfig::from_cli(Cli::parse()).inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;
    let client = PushshiftClient::new()?;

    let posts = download_posts(&client, &config);
    let records = ndjson::write_posts(posts, &config.dumpfile)
        .await
        .inspect_err(|e| {
            error!(path = %config.dumpfile.display(), error = %e, "Download failed");
        })?;

    let elapsed = start_time.elapsed();
    info!(
        records,
        path = %config.dumpfile.display(),
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    Ok(())
}
