//! In-memory record of every request a mock dispatched.
//!
//! Entries are bucketed by method, then by the exact URL string of the
//! restored (original) request. A bucket keeps insertion order; the order in
//! which buckets are visited by a pattern query is unspecified.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use regex::Regex;
use tracing::debug;

use crate::body::Body;
use crate::http::{HttpMethod, HttpRequest, RequestUrl};

/// A snapshot of a request as the caller sees it after dispatch.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: RequestUrl,
    pub headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl RecordedRequest {
    pub(crate) fn snapshot(request: &HttpRequest, body: Option<Bytes>) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body,
        }
    }

    /// A fresh reader over the recorded body, starting at the first byte.
    pub fn body(&self) -> Option<Body> {
        self.body.clone().map(Body::buffered)
    }

    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }
}

/// How `HistoryIndex::query` selects URL buckets.
#[derive(Debug, Clone)]
pub enum UrlQuery {
    /// The bucket whose key equals this string.
    Exact(String),
    /// Every bucket whose key matches this expression.
    Pattern(Regex),
}

impl From<&str> for UrlQuery {
    fn from(url: &str) -> Self {
        UrlQuery::Exact(url.to_string())
    }
}

impl From<String> for UrlQuery {
    fn from(url: String) -> Self {
        UrlQuery::Exact(url)
    }
}

impl From<&RequestUrl> for UrlQuery {
    fn from(url: &RequestUrl) -> Self {
        UrlQuery::Exact(url.to_string())
    }
}

impl From<Regex> for UrlQuery {
    fn from(pattern: Regex) -> Self {
        UrlQuery::Pattern(pattern)
    }
}

impl From<&Regex> for UrlQuery {
    fn from(pattern: &Regex) -> Self {
        UrlQuery::Pattern(pattern.clone())
    }
}

#[derive(Debug, Default)]
pub struct HistoryIndex {
    by_method: HashMap<HttpMethod, HashMap<String, Vec<RecordedRequest>>>,
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: RecordedRequest) {
        let key = entry.url.to_string();
        debug!(method = %entry.method, url = %key, "recording request");
        self.by_method
            .entry(entry.method.clone())
            .or_default()
            .entry(key)
            .or_default()
            .push(entry);
    }

    pub fn query(&self, method: HttpMethod, query: &UrlQuery) -> Vec<&RecordedRequest> {
        let Some(buckets) = self.by_method.get(&method) else {
            return Vec::new();
        };

        match query {
            UrlQuery::Exact(url) => buckets
                .get(url)
                .map(|entries| entries.iter().collect())
                .unwrap_or_default(),
            UrlQuery::Pattern(pattern) => buckets
                .iter()
                .filter(|(key, _)| pattern.is_match(key))
                .flat_map(|(_, entries)| entries.iter())
                .collect(),
        }
    }

    /// Total number of recorded requests across all methods.
    pub fn len(&self) -> usize {
        self.by_method
            .values()
            .flat_map(|buckets| buckets.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        self.by_method.clear();
    }
}
