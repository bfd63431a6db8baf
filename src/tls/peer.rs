use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use axum::Extension;
use axum::middleware::AddExtension;
use axum_server::accept::Accept;
use axum_server::tls_openssl::OpenSSLAcceptor;
use openssl::error::ErrorStack;
use openssl::ssl::SslRef;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_openssl::SslStream;
use tower::Layer;
use tracing::{trace, warn};

/// DER certificates presented by the TLS peer, leaf first.
///
/// Attached to every request served over a connection as a request extension.
#[derive(Debug, Clone, Default)]
pub struct PeerCertificates(Arc<[Vec<u8>]>);

impl PeerCertificates {
    pub fn new(chain: Vec<Vec<u8>>) -> Self {
        Self(chain.into())
    }

    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.0
    }

    pub fn leaf(&self) -> Option<&[u8]> {
        self.0.first().map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Collect the verified peer chain of an established session.
    pub fn from_ssl(ssl: &SslRef) -> Result<Self, ErrorStack> {
        let mut chain = Vec::new();
        if let Some(leaf) = ssl.peer_certificate() {
            chain.push(leaf.to_der()?);
        }
        if let Some(stack) = ssl.peer_cert_chain() {
            for cert in stack {
                let der = cert.to_der()?;
                if chain.first() != Some(&der) {
                    chain.push(der);
                }
            }
        }
        Ok(Self::new(chain))
    }
}

/// OpenSSL acceptor that exposes the client certificate chain to handlers.
#[derive(Clone)]
pub struct PeerCertAcceptor {
    inner: OpenSSLAcceptor,
}

impl PeerCertAcceptor {
    pub fn new(inner: OpenSSLAcceptor) -> Self {
        Self { inner }
    }
}

impl<I, S> Accept<I, S> for PeerCertAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = SslStream<I>;
    type Service = AddExtension<S, PeerCertificates>;
    type Future = Pin<Box<dyn Future<Output = io::Result<(Self::Stream, Self::Service)>> + Send>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();

        Box::pin(async move {
            let (stream, service) = acceptor.accept(stream, service).await?;
            let peers = PeerCertificates::from_ssl(stream.ssl()).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read peer certificates");
                PeerCertificates::default()
            });
            trace!(certificates = peers.as_slice().len(), "TLS handshake completed");

            Ok((stream, Extension(peers).layer(service)))
        })
    }
}
