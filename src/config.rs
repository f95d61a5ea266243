//! Run configuration.
//!
//! Everything the query builder and the pagination driver need is resolved
//! once at startup into a [`ScrapeConfig`] and passed down by reference.
//! Values come from, in order of precedence: CLI flags (and their env
//! fallbacks), the optional YAML file, then the built-in defaults.

use crate::cli::Cli;
use crate::error::ScrapeError;
use crate::models::{DEFAULT_FIELDS, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_URLBASE: &str = "https://api.pushshift.io/";

/// When the pagination driver decides there is no more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationPolicy {
    /// Stop when the upstream returns an empty page, or when every post on a
    /// page is past `before`. Pages emptied by the `after` filter are skipped.
    #[default]
    UpstreamEmpty,
    /// Stop as soon as no post on a page survives the bound filter.
    FilteredEmpty,
}

/// Optional YAML defaults file.
///
/// ```yaml
/// pushshift_urlbase: https://api.pushshift.io/
/// page_size: 500
/// fields: [author, created_utc, id, title]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub pushshift_urlbase: Option<String>,
    pub page_size: Option<u32>,
    pub fields: Option<Vec<String>>,
}

impl FileConfig {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ScrapeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let parsed: FileConfig = serde_yaml::from_str(&raw).map_err(|e| {
            ScrapeError::Config(format!("invalid config file {}: {e}", path.display()))
        })?;
        debug!(?parsed, "Loaded config file");
        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub urlbase: Url,
    pub subreddit: Option<String>,
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub dumpfile: PathBuf,
    pub page_size: u32,
    pub fields: Vec<String>,
    pub termination: TerminationPolicy,
}

impl ScrapeConfig {
    /// Resolve the final configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Config`] if the config file cannot be read, the URL
    /// base does not parse, the page size is zero, or `before < after`.
    pub fn from_cli(cli: Cli) -> Result<Self, ScrapeError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ScrapeError> {
        let raw_base = cli
            .pushshift_urlbase
            .or(file.pushshift_urlbase)
            .unwrap_or_else(|| DEFAULT_URLBASE.to_string());
        let urlbase = Url::parse(&raw_base)
            .map_err(|e| ScrapeError::Config(format!("invalid URL base {raw_base:?}: {e}")))?;

        let page_size = file.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ScrapeError::Config("page_size must be positive".to_string()));
        }

        if let (Some(after), Some(before)) = (cli.after, cli.before) {
            if before < after {
                return Err(ScrapeError::Config(format!(
                    "--before ({before}) is earlier than --after ({after})"
                )));
            }
        }

        let fields = file
            .fields
            .unwrap_or_else(|| DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect());

        let termination = if cli.stop_on_filtered_empty {
            TerminationPolicy::FilteredEmpty
        } else {
            TerminationPolicy::UpstreamEmpty
        };

        let subreddit = Some(cli.subreddit).filter(|s| !s.is_empty());

        let config = ScrapeConfig {
            urlbase,
            subreddit,
            after: cli.after,
            before: cli.before,
            dumpfile: cli.dumpfile,
            page_size,
            fields,
            termination,
        };
        info!(
            urlbase = %config.urlbase,
            subreddit = ?config.subreddit,
            after = ?config.after,
            before = ?config.before,
            page_size = config.page_size,
            termination = ?config.termination,
            "Resolved configuration"
        );
        Ok(config)
    }
}
