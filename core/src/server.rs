//! Lifecycle of the local server requests are redirected to.

use crate::error::ServerError;

/// The in-process server a mock redirects to. The mock only needs to bring it
/// up, learn where it listens, and shut it down again.
pub trait LocalServer {
    fn start(&mut self) -> Result<(), ServerError>;

    /// Starts with TLS; the server must already hold a certificate.
    fn start_tls(&mut self) -> Result<(), ServerError>;

    /// Base URL such as `http://127.0.0.1:41234`, `None` while stopped.
    fn base_url(&self) -> Option<String>;

    fn is_tls(&self) -> bool;

    fn close(&mut self);
}
