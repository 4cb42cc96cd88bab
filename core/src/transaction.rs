//! One intercepted call: prepare, dispatch, roll back.
//!
//! # Design
//! A `Transaction` mutably borrows the caller's request for the length of a
//! single `Mock::send`. `prepare` does every fallible step (URL rewrite, body
//! drain) before touching the request, so a failure leaves the URL as it was.
//! `rollback` is unconditional and also runs from `Drop`, which keeps the
//! request restored even if a transport panics mid-call.

use bytes::Bytes;
use tracing::debug;

use crate::body::{replicate, Body, DrainError};
use crate::error::MockError;
use crate::http::{HttpRequest, HttpResponse, RequestUrl};
use crate::rewrite::rewrite;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Created,
    Prepared,
    Dispatched,
    RolledBack,
}

pub(crate) struct Transaction<'r> {
    request: &'r mut HttpRequest,
    state: State,
    original_url: Option<RequestUrl>,
    body: Option<Bytes>,
}

impl<'r> Transaction<'r> {
    pub(crate) fn new(request: &'r mut HttpRequest) -> Self {
        Self {
            request,
            state: State::Created,
            original_url: None,
            body: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// Redirects the request to `server_base_url` and makes its body replayable.
    pub(crate) fn prepare(
        &mut self,
        server_base_url: &str,
        configured_scheme: &str,
    ) -> Result<(), MockError> {
        debug_assert_eq!(self.state, State::Created);

        let rewrite = rewrite(&self.request.url, server_base_url, configured_scheme)?;
        let body = match self.request.body.take() {
            None => None,
            Some(body) => match replicate(body) {
                Ok(bytes) => Some(bytes),
                Err(DrainError { source, body }) => {
                    self.request.body = Some(body);
                    return Err(MockError::BodyRead(source));
                }
            },
        };

        debug!(
            from = %rewrite.original,
            to = %rewrite.rewritten,
            body_bytes = body.as_ref().map_or(0, Bytes::len),
            "redirecting request to local server"
        );
        self.request.url = rewrite.rewritten;
        self.request.body = body.clone().map(Body::buffered);
        self.original_url = Some(rewrite.original);
        self.body = body;
        self.state = State::Prepared;
        Ok(())
    }

    pub(crate) fn dispatch(&mut self, transport: &dyn Transport) -> Result<HttpResponse, MockError> {
        debug_assert_eq!(self.state, State::Prepared, "dispatch before prepare");
        let result = transport.send(&mut *self.request).map_err(MockError::from);
        self.state = State::Dispatched;
        result
    }

    /// Puts the original URL back and rewinds the replicated body.
    pub(crate) fn rollback(&mut self) {
        if self.state == State::RolledBack {
            return;
        }
        if let Some(url) = self.original_url.take() {
            self.request.url = url;
        }
        if let Some(bytes) = &self.body {
            self.request.body = Some(Body::buffered(bytes.clone()));
        }
        self.state = State::RolledBack;
    }

    /// Rolls back and hands over the replicated body for recording.
    pub(crate) fn finish(mut self) -> Option<Bytes> {
        self.rollback();
        self.body.take()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::panic::{self, AssertUnwindSafe};

    use parking_lot::Mutex;

    use super::*;
    use crate::body::tests::BrokenReader;
    use crate::error::TransportError;

    const SERVER: &str = "http://127.0.0.1:41234";

    /// Records the URL and body it was handed.
    #[derive(Default)]
    struct Spy {
        seen: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl Transport for Spy {
        fn send(&self, request: &mut HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut body = Vec::new();
            if let Some(b) = request.body.as_mut() {
                b.read_to_end(&mut body).map_err(TransportError::new)?;
            }
            self.seen.lock().push((request.url.to_string(), body));
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: b"ok".to_vec(),
            })
        }
    }

    struct Refused;

    impl Transport for Refused {
        fn send(&self, _: &mut HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::new("connection refused"))
        }
    }

    struct Explodes;

    impl Transport for Explodes {
        fn send(&self, _: &mut HttpRequest) -> Result<HttpResponse, TransportError> {
            panic!("transport blew up");
        }
    }

    fn read_body(request: &mut HttpRequest) -> Vec<u8> {
        let mut out = Vec::new();
        request.body.as_mut().unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn full_lifecycle_restores_request() {
        let mut req = HttpRequest::post("https://api.example.com/foo?x=1", "payload").unwrap();
        let spy = Spy::default();

        let mut tx = Transaction::new(&mut req);
        assert_eq!(tx.state(), State::Created);
        tx.prepare(SERVER, "").unwrap();
        assert_eq!(tx.state(), State::Prepared);
        let resp = tx.dispatch(&spy).unwrap();
        assert_eq!(tx.state(), State::Dispatched);
        let body = tx.finish();

        assert_eq!(resp.status, 200);
        assert_eq!(body.as_deref(), Some(&b"payload"[..]));
        assert_eq!(
            spy.seen.lock().as_slice(),
            &[("http://127.0.0.1:41234/foo?x=1".to_string(), b"payload".to_vec())]
        );
        assert_eq!(req.url.to_string(), "https://api.example.com/foo?x=1");
        assert_eq!(read_body(&mut req), b"payload");
    }

    #[test]
    fn streamed_body_becomes_replayable() {
        let mut req = HttpRequest::new(crate::http::HttpMethod::Put, "http://api.example.com/up")
            .unwrap()
            .with_body(Body::from_reader(std::io::Cursor::new(b"streamed".to_vec())));

        let mut tx = Transaction::new(&mut req);
        tx.prepare(SERVER, "").unwrap();
        tx.dispatch(&Spy::default()).unwrap();
        drop(tx);

        assert!(req.body.as_ref().unwrap().is_replayable());
        assert_eq!(read_body(&mut req), b"streamed");
    }

    #[test]
    fn transport_error_still_rolls_back() {
        let mut req = HttpRequest::get("http://api.example.com").unwrap();
        let mut tx = Transaction::new(&mut req);
        tx.prepare(SERVER, "").unwrap();
        let err = tx.dispatch(&Refused).unwrap_err();
        tx.finish();

        assert!(matches!(err, MockError::Transport(_)));
        assert_eq!(req.url.to_string(), "http://api.example.com");
        assert!(req.body.is_none());
    }

    #[test]
    fn malformed_server_leaves_request_untouched() {
        let mut req = HttpRequest::post("http://api.example.com/foo", "keep me").unwrap();
        let mut tx = Transaction::new(&mut req);
        let err = tx.prepare("::bad", "").unwrap_err();
        assert_eq!(tx.state(), State::Created);
        drop(tx);

        assert!(matches!(err, MockError::MalformedServerAddress { .. }));
        assert_eq!(req.url.to_string(), "http://api.example.com/foo");
        assert_eq!(read_body(&mut req), b"keep me");
    }

    #[test]
    fn body_read_failure_aborts_before_redirect() {
        let mut req = HttpRequest::post(
            "http://api.example.com/foo",
            Body::from_reader(BrokenReader { served: false }),
        )
        .unwrap();
        let mut tx = Transaction::new(&mut req);
        let err = tx.prepare(SERVER, "").unwrap_err();
        drop(tx);

        assert!(matches!(err, MockError::BodyRead(_)));
        assert_eq!(req.url.to_string(), "http://api.example.com/foo");
        assert!(req.body.is_some());
    }

    #[test]
    fn panicking_transport_still_restores_url() {
        let mut req = HttpRequest::get("https://api.example.com/boom").unwrap();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut tx = Transaction::new(&mut req);
            tx.prepare(SERVER, "").unwrap();
            let _ = tx.dispatch(&Explodes);
        }));

        assert!(outcome.is_err());
        assert_eq!(req.url.to_string(), "https://api.example.com/boom");
    }
}
