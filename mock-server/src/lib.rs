use axum::{
    body::Bytes,
    http::{Method, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub mod server;
pub mod tls;

pub use server::TestServer;
pub use tls::TlsIdentity;

/// What `/echo` saw of a request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

/// Fixture routes: fixed bodies on `/foo`, `/bar` and `/baz`, a request
/// mirror on `/echo`, and "Hello World!" for everything else.
pub fn app() -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/foo", get(|| fixed("foo")).post(|| fixed("foo")))
        .route("/bar", get(|| fixed("bar")))
        .route("/baz", get(|| fixed("baz")))
        .route("/echo", any(echo))
        .fallback(hello)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn hello() -> &'static str {
    "Hello World!"
}

async fn fixed(body: &'static str) -> &'static str {
    body
}

async fn echo(method: Method, uri: Uri, body: Bytes) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_serializes_to_json() {
        let echo = Echo {
            method: "POST".to_string(),
            path: "/echo".to_string(),
            query: None,
            body: "payload".to_string(),
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["path"], "/echo");
        assert!(json["query"].is_null());
        assert_eq!(json["body"], "payload");
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "GET".to_string(),
            path: "/echo".to_string(),
            query: Some("a=1".to_string()),
            body: String::new(),
        };
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, echo);
    }
}
