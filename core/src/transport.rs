//! The pluggable dispatcher that actually sends a redirected request.
//!
//! # Design
//! The interception engine never touches the network itself. It hands the
//! already-redirected request to a `Transport` and passes whatever comes back
//! to the caller. `UreqTransport` is the default: a blocking `ureq` agent that
//! returns 4xx/5xx responses as data so status interpretation stays with the
//! code under test.

use std::io::Read;

use tracing::debug;
use ureq::tls::TlsConfig;
use ureq::Agent;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Sends a request and returns the response. Implementations read the body
/// from wherever it currently stands; the caller rewinds it afterwards.
pub trait Transport: Send + Sync {
    fn send(&self, request: &mut HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &mut HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Default transport backed by a blocking `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .proxy(None)
            .build()
            .new_agent();
        Self::from_agent(agent)
    }

    /// A transport that skips certificate verification, for talking to a
    /// local server with a self-signed certificate.
    pub fn insecure() -> Self {
        let tls = TlsConfig::builder().disable_verification(true).build();
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .proxy(None)
            .tls_config(tls)
            .build()
            .new_agent();
        Self::from_agent(agent)
    }

    pub fn from_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &mut HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_request_uri();
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut payload = Vec::new();
        if let Some(body) = request.body.as_mut() {
            body.read_to_end(&mut payload).map_err(TransportError::new)?;
        }
        debug!(method = %request.method, %url, bytes = payload.len(), "dispatching request");

        let result = if payload.is_empty() {
            self.agent.run(builder.body(()).map_err(TransportError::new)?)
        } else {
            self.agent
                .run(builder.body(payload.as_slice()).map_err(TransportError::new)?)
        };
        let mut response = result.map_err(TransportError::new)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(TransportError::new)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
