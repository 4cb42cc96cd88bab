//! HTTP request and response types seen by the interception engine.
//!
//! # Design
//! `HttpRequest` is owned by the caller and only ever borrowed by a
//! transaction. Its URL is a `RequestUrl`, which is parsed by the `url` crate
//! for validation but keeps the caller's textual shape: a URL written without
//! a path stays without one. That string is what history is keyed on and what
//! the unmocked-URL message prints, so `http://api.example.com` must not turn
//! into `http://api.example.com/`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::body::Body;
use crate::error::RequestError;

/// HTTP method for a request.
///
/// The common methods get their own variant and parse case-insensitively.
/// Anything else that is a valid token is kept verbatim in `Other`, since
/// extension methods are case-sensitive. Build methods through `parse` so
/// `"GET"` never ends up as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(method) => method,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFC 9110 `tchar`.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

impl FromStr for HttpMethod {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            _ if !s.is_empty() && s.chars().all(is_token_char) => HttpMethod::Other(s.to_string()),
            _ => return Err(RequestError::UnsupportedMethod(s.to_string())),
        })
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = RequestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Other(method) => method,
            known => known.as_str().to_string(),
        }
    }
}

/// An absolute request URL: scheme, optional userinfo, host (with port when
/// given), path, query and fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestUrl {
    scheme: String,
    userinfo: Option<String>,
    host: String,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl RequestUrl {
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        let parsed = Url::parse(input).map_err(|source| RequestError::InvalidUrl {
            url: input.to_string(),
            source,
        })?;
        let host = authority(&parsed).ok_or_else(|| RequestError::MissingHost(input.to_string()))?;

        let userinfo = match (parsed.username(), parsed.password()) {
            ("", None) => None,
            (user, None) => Some(user.to_string()),
            (user, Some(password)) => Some(format!("{user}:{password}")),
        };

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            userinfo,
            host,
            path: written_path(input, &parsed),
            query: parsed.query().map(str::to_string),
            fragment: parsed.fragment().map(str::to_string),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `user` or `user:password`, percent-encoded as written.
    pub fn userinfo(&self) -> Option<&str> {
        self.userinfo.as_deref()
    }

    /// Host including `:port` when the URL names one.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The URL as it goes on the wire: everything but the fragment.
    pub fn to_request_uri(&self) -> String {
        let mut out = format!("{}://", self.scheme);
        if let Some(userinfo) = &self.userinfo {
            out.push_str(userinfo);
            out.push('@');
        }
        out.push_str(&self.host);
        out.push_str(&self.path);
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }

    /// A copy pointing at `host` over `scheme`; everything else unchanged.
    pub(crate) fn with_target(&self, scheme: &str, host: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            ..self.clone()
        }
    }
}

/// The normalized path of `parsed`, or an empty string when `input` names no
/// path at all.
///
/// `Url` reports `/` both for `http://host` and `http://host/`. Any other path
/// was certainly written, so only a bare `/` needs the input consulted: it was
/// written when the part before query and fragment ends in a slash, possibly
/// followed by dot segments that collapsed onto it.
fn written_path(input: &str, parsed: &Url) -> String {
    let path = parsed.path();
    if path != "/" {
        return path.to_string();
    }
    let trimmed = input.trim_matches(|c: char| c.is_ascii_control() || c == ' ');
    let before_query = trimmed.split(['?', '#']).next().unwrap_or_default();
    if before_query.trim_end_matches('.').ends_with(['/', '\\']) {
        path.to_string()
    } else {
        String::new()
    }
}

/// `host[:port]` of a parsed URL, `None` when it has no host.
pub(crate) fn authority(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_request_uri())?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for RequestUrl {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An outbound HTTP request as issued by the code under test.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: RequestUrl,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: &str) -> Result<Self, RequestError> {
        Ok(Self {
            method,
            url: RequestUrl::parse(url)?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self, RequestError> {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: &str, body: impl Into<Body>) -> Result<Self, RequestError> {
        Ok(Self::new(HttpMethod::Post, url)?.with_body(body))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A response returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
