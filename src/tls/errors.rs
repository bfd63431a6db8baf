use std::io;
use std::path::PathBuf;

use openssl::error::ErrorStack;
use thiserror::Error;

/// Errors that can occur while setting up TLS.
#[derive(Error, Debug)]
pub enum TlsError {
    #[error(transparent)]
    OpenSSL(#[from] ErrorStack),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no server certificate found in certificate chain")]
    MissingServerCertificate,

    #[error("no CA certificates configured for client authentication")]
    MissingClientCa,
}
