//! A local server that runs an axum `Router` on a background thread.
//!
//! # Design
//! Callers of the mock are blocking, so the server cannot share their thread.
//! `start` binds `127.0.0.1:0`, builds a current-thread tokio runtime and moves
//! both onto a dedicated OS thread that accepts connections until `close`
//! fires a oneshot. Connections are served by hyper directly so the same loop
//! handles plain TCP and rustls streams. When the accept loop returns the
//! runtime is dropped, which cancels any connection still open.

use std::net::SocketAddr;
use std::thread::JoinHandle;

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use mock_core::{LocalServer, ServerError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::tls::TlsIdentity;

pub struct TestServer {
    router: Router,
    identity: Option<TlsIdentity>,
    running: Option<Running>,
}

struct Running {
    addr: SocketAddr,
    tls: bool,
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<()>,
}

impl TestServer {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            identity: None,
            running: None,
        }
    }

    /// Installs the certificate `start_tls` will serve.
    pub fn with_tls(mut self, identity: TlsIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    fn launch(&mut self, acceptor: Option<TlsAcceptor>) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (shutdown, signal) = oneshot::channel();
        let router = self.router.clone();
        let tls = acceptor.is_some();
        let thread = std::thread::Builder::new()
            .name(format!("mock-server-{}", addr.port()))
            .spawn(move || runtime.block_on(accept_loop(listener, router, acceptor, signal)))?;

        info!(%addr, tls, "local server listening");
        self.running = Some(Running {
            addr,
            tls,
            shutdown,
            thread,
        });
        Ok(())
    }
}

impl LocalServer for TestServer {
    fn start(&mut self) -> Result<(), ServerError> {
        self.launch(None)
    }

    fn start_tls(&mut self) -> Result<(), ServerError> {
        let acceptor = self
            .identity
            .as_ref()
            .ok_or(ServerError::MissingCertificate)?
            .acceptor();
        self.launch(Some(acceptor))
    }

    fn base_url(&self) -> Option<String> {
        self.running.as_ref().map(|r| {
            let scheme = if r.tls { "https" } else { "http" };
            format!("{scheme}://{}", r.addr)
        })
    }

    fn is_tls(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.tls)
    }

    fn close(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        // The loop may already be gone if it failed to start; nothing to signal then.
        let _ = running.shutdown.send(());
        if running.thread.join().is_err() {
            error!(addr = %running.addr, "local server thread panicked");
        }
        info!(addr = %running.addr, "local server stopped");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn accept_loop(
    listener: std::net::TcpListener,
    router: Router,
    acceptor: Option<TlsAcceptor>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, "failed to register listener with runtime");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(stream, peer, router.clone(), acceptor.clone()));
                }
                Err(err) => warn!(%err, "failed to accept connection"),
            },
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    acceptor: Option<TlsAcceptor>,
) {
    let service = TowerToHyperService::new(router);
    let result = match acceptor {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => {
                http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
            }
            Err(err) => {
                warn!(%peer, %err, "TLS handshake failed");
                return;
            }
        },
        None => {
            http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
        }
    };

    if let Err(err) = result {
        debug!(%peer, %err, "connection closed with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_empty_until_started() {
        let mut server = TestServer::new(crate::app());
        assert!(server.base_url().is_none());

        server.start().unwrap();
        let base = server.base_url().unwrap();
        assert!(base.starts_with("http://127.0.0.1:"), "{base}");
        assert!(!server.is_tls());

        server.close();
        assert!(server.base_url().is_none());
        assert!(server.addr().is_none());
    }

    #[test]
    fn second_start_is_rejected() {
        let mut server = TestServer::new(crate::app());
        server.start().unwrap();
        assert!(matches!(server.start(), Err(ServerError::AlreadyRunning)));
    }

    #[test]
    fn tls_requires_identity() {
        let mut server = TestServer::new(crate::app());
        assert!(matches!(server.start_tls(), Err(ServerError::MissingCertificate)));
        assert!(server.base_url().is_none());
    }

    #[test]
    fn tls_server_reports_https() {
        let mut server = TestServer::new(crate::app()).with_tls(TlsIdentity::localhost().unwrap());
        server.start_tls().unwrap();
        assert!(server.is_tls());
        assert!(server.base_url().unwrap().starts_with("https://127.0.0.1:"));
    }

    #[test]
    fn close_is_idempotent() {
        let mut server = TestServer::new(crate::app());
        server.start().unwrap();
        server.close();
        server.close();
    }
}
