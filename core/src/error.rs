//! Error types for the interception engine.
//!
//! # Design
//! `UnmockedError` is kept apart from `MockError` because it is never returned
//! from `Mock::send`: an out-of-scope request is reported through the failure
//! sink and still dispatched. Everything in `MockError` aborts the call, except
//! `Transport`, which is the transport's own failure handed back untouched.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::http::HttpMethod;

/// A request whose host or scheme falls outside the mock's configured scope.
///
/// The display form is relied on by existing assertions and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mock error: called to unmocked URL: [{method}] {url}")]
pub struct UnmockedError {
    pub method: HttpMethod,
    pub url: String,
}

/// Errors raised while building an `HttpRequest`.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unsupported HTTP method {0:?}")]
    UnsupportedMethod(String),

    #[error("invalid request URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request URL {0:?} has no host")]
    MissingHost(String),
}

/// Failures of the local server collaborator.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("local server is already running")]
    AlreadyRunning,

    #[error("TLS requested but no server certificate is configured")]
    MissingCertificate,

    #[error("invalid TLS identity: {0}")]
    InvalidIdentity(String),

    #[error("failed to bind local server: {0}")]
    Bind(#[from] io::Error),
}

/// An error produced by the underlying transport, passed through unmodified.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(Box<dyn StdError + Send + Sync>);

impl TransportError {
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(err.into())
    }

    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync> {
        self.0
    }
}

/// Errors returned by `Mock` operations.
#[derive(Debug, Error)]
pub enum MockError {
    /// The local server's base address could not be parsed.
    #[error("malformed server address {address:?}: {reason}")]
    MalformedServerAddress { address: String, reason: String },

    /// The request body failed while being buffered.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] io::Error),

    /// `send` was called before the local server was started.
    #[error("local server has not been started")]
    ServerNotStarted,

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
