//! Command-line interface definitions for pushshift_dump.
//!
//! The flag names mirror the Pushshift scraping scripts this tool replaces,
//! so `--pushshift_urlbase` keeps its underscore; the kebab-case spelling is
//! accepted as an alias.

use clap::Parser;
use std::path::PathBuf;

/// Download some reddit posts.
///
/// # Examples
///
/// ```sh
/// # Everything ever posted to r/rust
/// pushshift_dump rust rust.ndjson.gz
///
/// # One day, against a self-hosted mirror
/// pushshift_dump rust day.ndjson.gz --after 1600000000 --before 1600086400 \
///     --pushshift_urlbase http://localhost:8080/
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The subreddit to download
    pub subreddit: String,

    /// A .ndjson.gz file that will contain newline delimited JSON entries for
    /// all of the posts downloaded (ndjson spec: http://ndjson.org/)
    pub dumpfile: PathBuf,

    /// UTC epoch time posts must come before
    #[arg(long, allow_negative_numbers = true)]
    pub before: Option<i64>,

    /// UTC epoch time posts must come after
    #[arg(long, allow_negative_numbers = true)]
    pub after: Option<i64>,

    /// Base URL of the Pushshift API [default: https://api.pushshift.io/]
    #[arg(long = "pushshift_urlbase", alias = "pushshift-urlbase", env = "PUSHSHIFT_URLBASE")]
    pub pushshift_urlbase: Option<String>,

    /// Optional YAML file supplying defaults for the URL base, page size and field list
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop as soon as a page has no posts inside the bounds, even if the
    /// upstream returned posts outside them
    #[arg(long)]
    pub stop_on_filtered_empty: bool,
}
