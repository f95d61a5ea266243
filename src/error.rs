//! Error type shared by the query builder, the pagination driver and the sink.
//!
//! Every variant is fatal: nothing in the pipeline retries or recovers. An
//! empty page is the normal end-of-data signal and never shows up here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Invalid configuration detected before the first request.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Transport failure or a non-success HTTP status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not JSON, or `data` was missing or not an array of objects.
    #[error("could not parse response from {url}: {source} (body: {preview})")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
        preview: String,
    },

    /// A record without a numeric `created_utc` cannot advance the cursor.
    #[error("post {id} has no numeric created_utc")]
    MissingTimestamp { id: String },

    /// `created_utc` too large to advance the cursor past.
    #[error("post {id} has an out-of-range created_utc")]
    InvalidTimestamp { id: String },

    #[error("output file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize post: {0}")]
    Encode(#[source] serde_json::Error),
}
