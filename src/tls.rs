mod cert_utils;
mod errors;
mod peer;

pub use cert_utils::*;
pub use errors::TlsError;
pub use peer::{PeerCertAcceptor, PeerCertificates};

use std::path::Path;

use openssl::ssl::{
    SslAcceptor, SslAcceptorBuilder, SslMethod, SslSessionCacheMode, SslVerifyMode,
};
use openssl::x509::X509;
use tracing::{debug, instrument, trace};

/// Configuration for the TLS server.
///
/// Client certificates are requested but not required during the handshake,
/// so a connection without one still reaches the revocation gate, which
/// answers it with a proper HTTP denial.
#[derive(Clone)]
pub struct TlsConfig {
    cert_chain: Vec<u8>,
    private_key: Vec<u8>,
    client_ca_certs: Vec<Vec<u8>>,
}

impl TlsConfig {
    /// Creates a new TLS configuration from PEM encoded data
    ///
    /// # Arguments
    ///
    /// * `cert_chain` - Server certificate chain in PEM format.
    /// * `key` - Server private key in PEM format.
    pub fn from_pem(cert_chain: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_chain: cert_chain.into(),
            private_key: key.into(),
            client_ca_certs: Vec::new(),
        }
    }

    /// Loads the server certificate chain, private key and client CA bundle from PEM files.
    pub async fn from_pem_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        client_ca_path: impl AsRef<Path>,
    ) -> Result<Self, TlsError> {
        let cert_chain = read_file(cert_path.as_ref()).await?;
        let key = read_file(key_path.as_ref()).await?;
        let ca = read_file(client_ca_path.as_ref()).await?;

        Ok(Self::from_pem(cert_chain, key).with_client_auth(vec![ca]))
    }

    /// Trust the given CA certificates (PEM, one or more per entry) for client authentication.
    pub fn with_client_auth(mut self, ca_certs_pem: impl Into<Vec<Vec<u8>>>) -> Self {
        debug!("Enabling client authentication with CA certificates");
        self.client_ca_certs = ca_certs_pem.into();
        self
    }

    /// Build the TLS acceptor from the configuration.
    #[instrument(skip(self))]
    pub fn build_acceptor(&self) -> Result<SslAcceptor, TlsError> {
        let builder = self.create_acceptor_builder()?;
        Ok(builder.build())
    }

    fn create_acceptor_builder(&self) -> Result<SslAcceptorBuilder, TlsError> {
        let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server())?;

        trace!("Loading server certificate chain from PEM...");
        let certs = X509::stack_from_pem(&self.cert_chain)?;
        let mut certs = certs.into_iter();
        let leaf = certs.next().ok_or(TlsError::MissingServerCertificate)?;
        builder.set_certificate(&leaf)?;
        for cert in certs {
            builder.add_extra_chain_cert(cert)?;
        }

        trace!("Loading server private key from PEM...");
        let key = openssl::pkey::PKey::private_key_from_pem(&self.private_key)?;
        builder.set_private_key(&key)?;
        builder.check_private_key()?;
        debug!("Set server certificate and private key");

        if self.client_ca_certs.is_empty() {
            return Err(TlsError::MissingClientCa);
        }

        debug!("Loading trusted CA certificates for client authentication...");
        for pem in &self.client_ca_certs {
            for ca_cert in X509::stack_from_pem(pem)? {
                builder.add_client_ca(&ca_cert)?;
                builder.cert_store_mut().add_cert(ca_cert)?;
            }
        }

        builder.set_verify(SslVerifyMode::PEER);
        builder.set_session_cache_mode(SslSessionCacheMode::SERVER);

        Ok(builder)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    tokio::fs::read(path).await.map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
