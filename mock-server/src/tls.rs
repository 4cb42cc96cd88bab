//! Server certificates for the TLS flavour of `TestServer`.
//!
//! A `TlsIdentity` is a ready rustls server configuration built from a PEM
//! certificate chain and private key. `TlsIdentity::localhost()` uses the
//! self-signed certificate bundled under `certs/` (valid for `127.0.0.1` and
//! `localhost`), so clients must either trust it or skip verification.

use std::sync::Arc;

use mock_core::ServerError;
use rustls::pki_types::CertificateDer;
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

#[derive(Clone)]
pub struct TlsIdentity {
    config: Arc<ServerConfig>,
}

impl TlsIdentity {
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, ServerError> {
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<_, _>>()
            .map_err(|e| invalid(format!("failed to parse certificate: {e}")))?;
        if certs.is_empty() {
            return Err(invalid("no certificate found".to_string()));
        }

        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| invalid(format!("failed to parse private key: {e}")))?
            .ok_or_else(|| invalid("no private key found".to_string()))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| invalid(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The bundled self-signed certificate for `127.0.0.1`.
    pub fn localhost() -> Result<Self, ServerError> {
        Self::from_pem(
            include_bytes!("../certs/localhost.pem"),
            include_bytes!("../certs/localhost-key.pem"),
        )
    }

    pub(crate) fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(Arc::clone(&self.config))
    }
}

fn invalid(reason: String) -> ServerError {
    ServerError::InvalidIdentity(reason)
}
