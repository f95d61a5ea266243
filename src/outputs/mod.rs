//! Output sinks for downloaded posts.
//!
//! # Submodules
//!
//! - [`ndjson`]: gzip-compressed newline-delimited JSON, one post per line
//!   with keys sorted, written in truncate mode at compression level 9

pub mod ndjson;
