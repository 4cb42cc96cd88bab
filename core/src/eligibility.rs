//! Scope check deciding whether a request belongs to a mock.

use crate::config::MockConfig;
use crate::error::UnmockedError;
use crate::http::HttpRequest;

/// Accepts `request` when both its host and scheme fall within `config`.
pub fn check(request: &HttpRequest, config: &MockConfig) -> Result<(), UnmockedError> {
    let url = &request.url;
    let host_ok = config.host.is_empty() || config.host == url.host();
    let scheme_ok = config.scheme.is_empty() || config.scheme == url.scheme();

    if host_ok && scheme_ok {
        Ok(())
    } else {
        Err(UnmockedError {
            method: request.method.clone(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> HttpRequest {
        HttpRequest::get(url).unwrap()
    }

    #[test]
    fn unrestricted_config_accepts_everything() {
        let config = MockConfig::default();
        for url in [
            "http://api.example.com",
            "https://example.com",
            "http://blog.example.com/posts?page=2",
        ] {
            assert!(check(&get(url), &config).is_ok(), "{url}");
        }
    }

    #[test]
    fn host_mismatch_is_rejected() {
        let config = MockConfig::new().host("google.com");
        let err = check(&get("http://api.example.com"), &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "mock error: called to unmocked URL: [GET] http://api.example.com"
        );
        assert!(check(&get("http://google.com"), &config).is_ok());
    }

    #[test]
    fn scheme_mismatch_is_rejected() {
        let config = MockConfig::new().scheme("https");
        let err = check(&get("http://api.example.com"), &config).unwrap_err();
        assert_eq!(err.url, "http://api.example.com");
        assert!(check(&get("https://api.example.com"), &config).is_ok());
    }

    #[test]
    fn host_comparison_includes_port() {
        let config = MockConfig::new().host("localhost:8080");
        assert!(check(&get("http://localhost:8080/x"), &config).is_ok());
        assert!(check(&get("http://localhost:9090/x"), &config).is_err());
    }

    #[test]
    fn both_fields_must_match() {
        let config = MockConfig::new().scheme("https").host("api.example.com");
        assert!(check(&get("https://api.example.com"), &config).is_ok());
        assert!(check(&get("http://api.example.com"), &config).is_err());
        assert!(check(&get("https://example.com"), &config).is_err());
    }

    #[test]
    fn rejection_carries_method() {
        let config = MockConfig::new().host("google.com");
        let req = HttpRequest::post("http://api.example.com/foo", "x").unwrap();
        let err = check(&req, &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "mock error: called to unmocked URL: [POST] http://api.example.com/foo"
        );
    }
}
