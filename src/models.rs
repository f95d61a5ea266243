//! Data models for the Pushshift submission search endpoint.
//!
//! - [`Post`]: one submission record, kept as the raw JSON object the
//!   upstream returned so that nothing is lost or reordered on the way out
//! - [`CreatedUtc`]: a `created_utc` value, integer or fractional
//! - [`SearchResponse`]: the `{"data": [...]}` envelope around a page
//! - [`SortedKeys`]: serialization adapter that emits object keys in
//!   lexicographic order at every nesting level

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Fields requested from the upstream, in request order.
pub const DEFAULT_FIELDS: [&str; 11] = [
    "author",
    "created_utc",
    "permalink",
    "id",
    "num_comments",
    "num_crossposts",
    "retrieved_on",
    "score",
    "subreddit",
    "title",
    "selftext",
];

/// Maximum page size the upstream will honour.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// A `created_utc` value.
///
/// Pushshift has served `created_utc` both as an integer and as a float
/// over the years. Bound checks use the exact value; only the pagination
/// cursor works in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreatedUtc {
    Seconds(i64),
    Fractional(f64),
}

impl CreatedUtc {
    /// Floor to whole seconds. Out-of-range floats saturate.
    pub fn whole_seconds(self) -> i64 {
        match self {
            CreatedUtc::Seconds(secs) => secs,
            CreatedUtc::Fractional(f) => f.floor() as i64,
        }
    }

    /// `self >= bound`, compared exactly.
    pub fn is_at_or_after(self, bound: i64) -> bool {
        match self {
            CreatedUtc::Seconds(secs) => secs >= bound,
            CreatedUtc::Fractional(f) => f >= bound as f64,
        }
    }

    /// `self <= bound`, compared exactly.
    pub fn is_at_or_before(self, bound: i64) -> bool {
        match self {
            CreatedUtc::Seconds(secs) => secs <= bound,
            CreatedUtc::Fractional(f) => f <= bound as f64,
        }
    }
}

/// A single submission record.
///
/// The record is passed through unmodified; only `created_utc` is ever
/// interpreted, as the pagination cursor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Post(Map<String, Value>);

impl Post {
    /// Creation time exactly as the upstream sent it.
    ///
    /// # Returns
    ///
    /// `None` if `created_utc` is missing or not a JSON number.
    pub fn timestamp(&self) -> Option<CreatedUtc> {
        let value = self.0.get("created_utc")?;
        match value.as_i64() {
            Some(secs) => Some(CreatedUtc::Seconds(secs)),
            None => value.as_f64().map(CreatedUtc::Fractional),
        }
    }

    /// Creation time in whole epoch seconds, floored.
    pub fn created_utc(&self) -> Option<i64> {
        self.timestamp().map(CreatedUtc::whole_seconds)
    }

    /// Post id for log and error messages, `"<unknown>"` when absent.
    pub fn id(&self) -> String {
        match self.0.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "<unknown>".to_string(),
        }
    }
}

/// Response envelope of `/reddit/search/submission/`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<Post>,
}

/// Serializes a JSON value with object keys sorted, recursively.
///
/// `serde_json::Map` is only sorted when the `preserve_order` feature is off,
/// and any crate in the graph can turn it on, so the output never relies on it.
pub struct SortedKeys<'a>(pub &'a Value);

impl Serialize for SortedKeys<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => SortedMap(map).serialize(serializer),
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&SortedKeys(item))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

struct SortedMap<'a>(&'a Map<String, Value>);

impl Serialize for SortedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&String, &Value)> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let mut out = serializer.serialize_map(Some(entries.len()))?;
        for (k, v) in entries {
            out.serialize_entry(k, &SortedKeys(v))?;
        }
        out.end()
    }
}

impl Post {
    /// One NDJSON line, without the trailing newline.
    pub fn to_sorted_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SortedMap(&self.0))
    }
}
