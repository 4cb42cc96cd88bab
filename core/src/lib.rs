//! Test double for an outbound HTTP client.
//!
//! # Overview
//! A `Mock` takes requests the code under test would send to real hosts,
//! quietly points them at a local in-process server, sends them, and hands
//! the response back as if the real host had answered. The caller's request
//! comes back unchanged, and every request is kept in an in-memory history
//! that can be searched by method and exact URL or regular expression.
//!
//! # Design
//! - `Transaction` owns the prepare / dispatch / rollback sequence for one call.
//! - The local server, the failure sink and the network transport are traits
//!   (`LocalServer`, `FailureReporter`, `Transport`) so the engine can be driven
//!   entirely by fakes in tests.
//! - Bodies are drained into `Bytes` once, so the local server, the caller
//!   and history all read the same payload.

pub mod body;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod history;
pub mod http;
pub mod mock;
pub mod reporter;
pub mod rewrite;
pub mod server;
mod transaction;
pub mod transport;

pub use body::Body;
pub use config::MockConfig;
pub use error::{MockError, RequestError, ServerError, TransportError, UnmockedError};
pub use history::{HistoryIndex, RecordedRequest, UrlQuery};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestUrl};
pub use mock::Mock;
pub use reporter::{FailureReporter, PanicReporter, RecordingReporter};
pub use server::LocalServer;
pub use transport::{Transport, UreqTransport};
