//! Pagination driver.
//!
//! Walks the submission search forward in time: request a page with the
//! current cursor as `after`, drop posts outside the caller's bounds, yield
//! the survivors, then move the cursor to one past the newest post on the
//! (unfiltered) page. The result is a lazy, single-pass [`Stream`] of posts.
//!
//! # Termination
//!
//! See [`TerminationPolicy`]. Under the default policy a page that the
//! bound filter empties does not end the run; the cursor still advances past
//! it. A page whose posts all lie past `before` does end it, since results
//! are sorted ascending and nothing later can qualify.
//!
//! The driver also stops if the cursor would repeat a value it has already
//! requested, which only happens when the upstream ignores `after`.

use crate::api::{PageSource, search_url};
use crate::config::{ScrapeConfig, TerminationPolicy};
use crate::error::ScrapeError;
use crate::models::Post;
use crate::utils::format_cursor;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What one page contributes to the run.
#[derive(Debug, PartialEq)]
pub struct PageStep {
    /// Posts inside the bounds, in upstream order.
    pub kept: Vec<Post>,
    /// `max(created_utc) + 1` over the unfiltered page, `None` if it was empty.
    pub next_cursor: Option<i64>,
    /// The run ends after this page.
    pub stop: bool,
}

/// Filter a page against the bounds and work out where to go next.
///
/// `after` and `before` are both inclusive and compared against the exact
/// `created_utc`, so `200.5` is past `before = 200`. The next cursor is
/// computed in whole seconds.
///
/// # Errors
///
/// - [`ScrapeError::MissingTimestamp`] if any post on the page, kept or not,
///   lacks a numeric `created_utc`
/// - [`ScrapeError::InvalidTimestamp`] if the newest post is too far in the
///   future to advance the cursor past
pub fn process_page(
    page: Vec<Post>,
    after: Option<i64>,
    before: Option<i64>,
    policy: TerminationPolicy,
) -> Result<PageStep, ScrapeError> {
    let mut stamped = Vec::with_capacity(page.len());
    for post in page {
        let ts = post
            .timestamp()
            .ok_or_else(|| ScrapeError::MissingTimestamp { id: post.id() })?;
        stamped.push((ts, post));
    }

    let next_cursor = match stamped.iter().max_by_key(|(ts, _)| ts.whole_seconds()) {
        Some((ts, post)) => Some(
            ts.whole_seconds()
                .checked_add(1)
                .ok_or_else(|| ScrapeError::InvalidTimestamp { id: post.id() })?,
        ),
        None => None,
    };
    let all_past_before = match before {
        Some(before) => {
            !stamped.is_empty() && stamped.iter().all(|(ts, _)| !ts.is_at_or_before(before))
        }
        None => false,
    };

    let kept: Vec<Post> = stamped
        .into_iter()
        .filter(|(ts, _)| after.is_none_or(|a| ts.is_at_or_after(a)))
        .filter(|(ts, _)| before.is_none_or(|b| ts.is_at_or_before(b)))
        .map(|(_, post)| post)
        .collect();

    let stop = match policy {
        TerminationPolicy::FilteredEmpty => kept.is_empty(),
        TerminationPolicy::UpstreamEmpty => next_cursor.is_none() || all_past_before,
    };

    Ok(PageStep {
        kept,
        next_cursor,
        stop,
    })
}

struct Cursor<'a, S> {
    source: &'a S,
    config: &'a ScrapeConfig,
    position: Option<i64>,
    requested: HashSet<Option<i64>>,
    done: bool,
}

async fn next_page<'a, S: PageSource>(
    mut cursor: Cursor<'a, S>,
) -> Result<Option<(Vec<Post>, Cursor<'a, S>)>, ScrapeError> {
    if cursor.done {
        return Ok(None);
    }
    let config = cursor.config;
    let url = search_url(
        &config.urlbase,
        cursor.position,
        config.before,
        config.subreddit.as_deref(),
        config.page_size,
        config.fields.as_slice(),
    );
    cursor.requested.insert(cursor.position);

    let page = cursor.source.fetch_page(&url).await?;
    let fetched = page.len();
    let step = process_page(page, config.after, config.before, config.termination)?;

    info!(
        fetched,
        kept = step.kept.len(),
        url = %url,
        cursor = ?cursor.position,
        up_to = %format_cursor(cursor.position),
        "Fetched batch of posts"
    );

    if step.stop {
        info!(cursor = ?cursor.position, "No more data available, returning early");
        return Ok(None);
    }

    let next = step.next_cursor;
    if cursor.requested.contains(&next) {
        warn!(
            cursor = ?cursor.position,
            next = ?next,
            "Upstream did not advance past the cursor; stopping"
        );
        cursor.done = true;
    } else {
        debug!(from = ?cursor.position, to = ?next, "Advancing cursor");
        cursor.position = next;
    }

    Ok(Some((step.kept, cursor)))
}

/// Stream every post of the configured subreddit between the bounds.
///
/// The stream yields at most one error, after which it ends.
pub fn download_posts<'a, S: PageSource>(
    source: &'a S,
    config: &'a ScrapeConfig,
) -> impl Stream<Item = Result<Post, ScrapeError>> + 'a {
    let start = Cursor {
        source,
        config,
        position: config.after,
        requested: HashSet::new(),
        done: false,
    };

    stream::try_unfold(start, |cursor| next_page(cursor))
        .map_ok(|posts| stream::iter(posts.into_iter().map(Ok::<Post, ScrapeError>)))
        .try_flatten()
}
