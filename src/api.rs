//! Pushshift search API access.
//!
//! - [`search_url`]: builds one page request for the submission search endpoint
//! - [`PageSource`]: anything that can turn a request URL into a page of posts
//! - [`PushshiftClient`]: the `reqwest` implementation used in production
//!
//! There is no retry layer: any transport error, non-2xx
//! status or unparsable body aborts the run.

use crate::error::ScrapeError;
use crate::models::{Post, SearchResponse};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::{Url, form_urlencoded};

const SEARCH_PATH: &str = "reddit/search/submission/";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the URL for one page of the submission search.
///
/// Parameters are emitted in a fixed order: `size`, `sort`, `sort_type`,
/// then `subreddit`, `before` and `after` when present, and finally
/// `fields`. The field list is comma-joined verbatim.
///
/// # Examples
///
/// ```ignore
/// let base = Url::parse("https://api.pushshift.io/")?;
/// let url = search_url(&base, Some(100), None, Some("rust"), 500, &["id"]);
/// assert_eq!(
///     url.as_str(),
///     "https://api.pushshift.io/reddit/search/submission/?size=500&sort=asc&sort_type=created_utc&subreddit=rust&after=100&fields=id"
/// );
/// ```
pub fn search_url<S: AsRef<str>>(
    base: &Url,
    after: Option<i64>,
    before: Option<i64>,
    subreddit: Option<&str>,
    page_size: u32,
    fields: &[S],
) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/{SEARCH_PATH}"));

    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("size", &page_size.to_string())
        .append_pair("sort", "asc")
        .append_pair("sort_type", "created_utc");
    if let Some(subreddit) = subreddit.filter(|s| !s.is_empty()) {
        query.append_pair("subreddit", subreddit);
    }
    if let Some(before) = before {
        query.append_pair("before", &before.to_string());
    }
    if let Some(after) = after {
        query.append_pair("after", &after.to_string());
    }
    let fields = fields.iter().map(AsRef::as_ref).join(",");
    url.set_query(Some(&format!("{}&fields={fields}", query.finish())));
    url
}

/// Source of result pages.
///
/// The pagination driver only ever talks to this trait, which keeps the
/// paging logic testable without a network.
pub trait PageSource {
    /// Fetch and decode the page at `url`.
    async fn fetch_page(&self, url: &Url) -> Result<Vec<Post>, ScrapeError>;
}

/// HTTP client for a Pushshift-compatible server.
///
/// No timeout is configured; a stalled upstream blocks the run.
#[derive(Debug, Clone)]
pub struct PushshiftClient {
    http: Client,
}

impl PushshiftClient {
    /// Build a client that identifies itself as `pushshift_dump/<version>`.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Http`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, ScrapeError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

impl PageSource for PushshiftClient {
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn fetch_page(&self, url: &Url) -> Result<Vec<Post>, ScrapeError> {
        let t0 = Instant::now();
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if let Err(e) = response.error_for_status_ref() {
            warn!(%status, "Upstream returned an error status");
            return Err(e.into());
        }

        let body = response.text().await?;
        debug!(
            %status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Received page"
        );

        serde_json::from_str::<SearchResponse>(&body)
            .map(|page| page.data)
            .map_err(|source| ScrapeError::Parse {
                url: url.to_string(),
                source,
                preview: truncate_for_log(&body, 300),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_FIELDS;
    use mockito::{Matcher, Server};

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_search_url_minimal() {
        let url = search_url(&base("https://api.pushshift.io/"), None, None, None, 500, &["id"]);
        assert_eq!(
            url.as_str(),
            "https://api.pushshift.io/reddit/search/submission/?size=500&sort=asc&sort_type=created_utc&fields=id"
        );
    }

    #[test]
    fn test_search_url_all_parameters() {
        let url = search_url(
            &base("https://api.pushshift.io/"),
            Some(100),
            Some(200),
            Some("rust"),
            500,
            &DEFAULT_FIELDS,
        );
        assert_eq!(
            url.as_str(),
            "https://api.pushshift.io/reddit/search/submission/?size=500&sort=asc&sort_type=created_utc\
             &subreddit=rust&before=200&after=100\
             &fields=author,created_utc,permalink,id,num_comments,num_crossposts,retrieved_on,score,subreddit,title,selftext"
        );
    }

    #[test]
    fn test_search_url_trailing_slash_is_irrelevant() {
        let with = search_url(&base("http://mirror:8080/api/"), Some(1), None, None, 10, &["id"]);
        let without = search_url(&base("http://mirror:8080/api"), Some(1), None, None, 10, &["id"]);
        assert_eq!(with, without);
        assert_eq!(with.path(), "/api/reddit/search/submission/");
    }

    #[test]
    fn test_search_url_empty_subreddit_is_omitted() {
        let url = search_url(&base("http://x/"), None, None, Some(""), 500, &["id"]);
        assert!(!url.as_str().contains("subreddit="));
    }

    #[test]
    fn test_search_url_escapes_subreddit() {
        let url = search_url(&base("http://x/"), None, None, Some("a&b"), 500, &["id"]);
        assert!(url.as_str().contains("subreddit=a%26b"));
    }

    #[tokio::test]
    async fn test_fetch_page_parses_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/reddit/search/submission/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("subreddit".into(), "rust".into()),
                Matcher::UrlEncoded("after".into(), "100".into()),
                Matcher::UrlEncoded("sort".into(), "asc".into()),
            ]))
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"id": "a", "created_utc": 100}, {"id": "b", "created_utc": 101}]}"#)
            .create_async()
            .await;

        let client = PushshiftClient::new().unwrap();
        let url = search_url(&base(&server.url()), Some(100), None, Some("rust"), 500, &["id"]);
        let posts = client.fetch_page(&url).await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id(), "a");
        assert_eq!(posts[1].created_utc(), Some(101));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_page_http_error_is_fatal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = PushshiftClient::new().unwrap();
        let url = search_url(&base(&server.url()), None, None, None, 500, &["id"]);
        let err = client.fetch_page(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_page_non_json_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body("<html>rate limited</html>")
            .create_async()
            .await;

        let client = PushshiftClient::new().unwrap();
        let url = search_url(&base(&server.url()), None, None, None, 500, &["id"]);
        match client.fetch_page(&url).await {
            Err(ScrapeError::Parse { preview, .. }) => assert!(preview.contains("rate limited")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_page_missing_data_field() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "nope"}"#)
            .create_async()
            .await;

        let client = PushshiftClient::new().unwrap();
        let url = search_url(&base(&server.url()), None, None, None, 500, &["id"]);
        assert!(matches!(
            client.fetch_page(&url).await,
            Err(ScrapeError::Parse { .. })
        ));
    }
}
