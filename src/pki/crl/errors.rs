use std::io;
use std::path::PathBuf;

use thiserror::Error;
use x509_parser::prelude::{PEMError, X509Error};

/// CRL-related errors
#[derive(Error, Debug)]
pub enum CrlError {
    #[error("failed to read CRL file {}: {source}", .path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CRL file {} exceeds the limit of {limit} bytes", .path.display())]
    TooLarge { path: PathBuf, limit: u64 },

    #[error("invalid PEM framing in block {block}: {source}")]
    Pem {
        block: usize,
        #[source]
        source: PEMError,
    },

    #[error("CRL parsing failed in block {block}: {source}")]
    Parse {
        block: usize,
        #[source]
        source: X509Error,
    },
}

impl CrlError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CrlError::FileUnreadable {
            path: path.into(),
            source,
        }
    }

    /// True when the file was read but its content is not a valid CRL bundle.
    pub fn is_malformed(&self) -> bool {
        matches!(self, CrlError::Pem { .. } | CrlError::Parse { .. })
    }

    /// True when the file could not be read or stat'ed.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            CrlError::FileUnreadable { .. } | CrlError::TooLarge { .. }
        )
    }
}

/// Convenient Result type alias
pub type CrlResult<T> = Result<T, CrlError>;
