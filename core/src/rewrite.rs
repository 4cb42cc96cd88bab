//! Redirection of a request URL onto the local server.

use url::Url;

use crate::error::MockError;
use crate::http::{authority, RequestUrl};

/// Scheme used when the mock is not scoped to one. The local server is
/// assumed to be plain unless the mock is explicitly scoped to `https`.
const DEFAULT_SCHEME: &str = "http";

/// The redirected URL together with the original it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub rewritten: RequestUrl,
    pub original: RequestUrl,
}

/// Points `original` at the host of `server_base_url`, keeping path and query.
pub fn rewrite(
    original: &RequestUrl,
    server_base_url: &str,
    configured_scheme: &str,
) -> Result<Rewrite, MockError> {
    let malformed = |reason: String| MockError::MalformedServerAddress {
        address: server_base_url.to_string(),
        reason,
    };
    let base = Url::parse(server_base_url).map_err(|err| malformed(err.to_string()))?;
    let host = authority(&base).ok_or_else(|| malformed("no host".to_string()))?;

    let scheme = if configured_scheme.is_empty() {
        DEFAULT_SCHEME
    } else {
        original.scheme()
    };

    Ok(Rewrite {
        rewritten: original.with_target(scheme, &host),
        original: original.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> RequestUrl {
        RequestUrl::parse(s).unwrap()
    }

    #[test]
    fn replaces_host_and_keeps_path_and_query() {
        let original = url("http://api.example.com/foo?bar=baz");
        let rw = rewrite(&original, "http://127.0.0.1:41234", "").unwrap();
        assert_eq!(rw.rewritten.to_string(), "http://127.0.0.1:41234/foo?bar=baz");
        assert_eq!(rw.original, original);
    }

    #[test]
    fn unscoped_mock_forces_plain_scheme() {
        let rw = rewrite(&url("https://example.com/x"), "http://127.0.0.1:5000", "").unwrap();
        assert_eq!(rw.rewritten.scheme(), "http");
        assert_eq!(rw.original.scheme(), "https");
    }

    #[test]
    fn scoped_mock_keeps_request_scheme() {
        let rw = rewrite(&url("https://example.com"), "https://127.0.0.1:5000", "https").unwrap();
        assert_eq!(rw.rewritten.to_string(), "https://127.0.0.1:5000");
    }

    #[test]
    fn bare_root_stays_bare() {
        let rw = rewrite(&url("http://api.example.com"), "http://127.0.0.1:5000", "").unwrap();
        assert_eq!(rw.rewritten.to_string(), "http://127.0.0.1:5000");
    }

    #[test]
    fn malformed_server_address_fails() {
        let err = rewrite(&url("http://api.example.com"), "::not-a-url", "").unwrap_err();
        assert!(matches!(err, MockError::MalformedServerAddress { .. }));
    }

    #[test]
    fn hostless_server_address_fails() {
        let err = rewrite(&url("http://api.example.com"), "unix:/tmp/sock", "").unwrap_err();
        assert!(matches!(err, MockError::MalformedServerAddress { .. }));
    }
}
