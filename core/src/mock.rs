//! The mock instance: scope, collaborators, entry point and history.

use tracing::{debug, info, warn};

use crate::config::MockConfig;
use crate::eligibility;
use crate::error::MockError;
use crate::history::{HistoryIndex, RecordedRequest, UrlQuery};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::reporter::{FailureReporter, PanicReporter};
use crate::server::LocalServer;
use crate::transaction::Transaction;
use crate::transport::{Transport, UreqTransport};

/// Intercepts requests meant for remote hosts and serves them from a local
/// server instead.
///
/// Every method that changes state takes `&mut self`, so one mock is driven
/// by one caller at a time.
pub struct Mock<S, R = PanicReporter> {
    config: MockConfig,
    server: S,
    reporter: R,
    transport: Box<dyn Transport>,
    history: HistoryIndex,
}

impl<S: LocalServer, R: FailureReporter> Mock<S, R> {
    pub fn new(server: S, reporter: R) -> Self {
        Self {
            config: MockConfig::default(),
            server,
            reporter,
            transport: Box::new(UreqTransport::new()),
            history: HistoryIndex::new(),
        }
    }

    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MockConfig {
        &mut self.config
    }

    /// Replaces the transport, e.g. with one that trusts the local server's
    /// self-signed certificate.
    pub fn use_transport(&mut self, transport: impl Transport + 'static) {
        self.transport = Box::new(transport);
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn base_url(&self) -> Option<String> {
        self.server.base_url()
    }

    pub fn start(&mut self) -> Result<(), MockError> {
        if let Err(err) = self.server.start() {
            return Err(self.fatal(err.into()));
        }
        info!(base_url = ?self.server.base_url(), "mock server started");
        Ok(())
    }

    pub fn start_tls(&mut self) -> Result<(), MockError> {
        if let Err(err) = self.server.start_tls() {
            return Err(self.fatal(err.into()));
        }
        self.warn_if_tls_unscoped();
        info!(base_url = ?self.server.base_url(), "mock server started with TLS");
        Ok(())
    }

    /// Sends `request` to the local server as if it were its real destination.
    ///
    /// An out-of-scope request is reported as a non-fatal error and still
    /// dispatched. The request's URL and body are restored before returning,
    /// whatever the outcome, and the request is appended to history unless a
    /// fatal condition stopped it before dispatch.
    pub fn send(&mut self, request: &mut HttpRequest) -> Result<HttpResponse, MockError> {
        if let Err(err) = eligibility::check(request, &self.config) {
            warn!(method = %err.method, url = %err.url, "request outside mock scope");
            self.reporter.error(&err.to_string());
        }

        let Some(base_url) = self.server.base_url() else {
            return Err(self.fatal(MockError::ServerNotStarted));
        };

        self.warn_if_tls_unscoped();

        let mut tx = Transaction::new(request);
        if let Err(err) = tx.prepare(&base_url, &self.config.scheme) {
            drop(tx);
            return Err(self.fatal(err));
        }
        let result = tx.dispatch(&*self.transport);
        let body = tx.finish();

        if let Err(err) = &result {
            debug!(%err, "transport returned an error");
        }
        self.history.record(RecordedRequest::snapshot(request, body));
        result
    }

    /// Requests recorded under `method` whose URL matches `query`.
    pub fn history(&self, method: HttpMethod, query: impl Into<UrlQuery>) -> Vec<&RecordedRequest> {
        self.history.query(method, &query.into())
    }

    pub fn history_index(&self) -> &HistoryIndex {
        &self.history
    }

    /// Closes the local server and forgets all recorded requests.
    pub fn done(&mut self) {
        self.history.reset();
        self.server.close();
        info!("mock server closed");
    }

    /// Without a configured scheme requests are rewritten to plain `http`,
    /// which a TLS server cannot answer.
    fn warn_if_tls_unscoped(&self) {
        if self.config.scheme.is_empty() && self.server.is_tls() {
            warn!("local server speaks TLS but the mock has no scheme; requests will be sent as http");
        }
    }

    fn fatal(&self, err: MockError) -> MockError {
        self.reporter.fatal(&err.to_string());
        err
    }
}
