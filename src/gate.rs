//! Per-request revocation decision.
//!
//! The gate takes the verified TLS peer chain of a request (leaf first), looks
//! the leaf serial up in the current revocation snapshot and either lets the
//! request through or denies it. It never touches the filesystem and never
//! waits on a reload.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use x509_parser::prelude::*;

use crate::pki::crl::{RevocationStore, SerialNumber};

/// Behavior when no revocation snapshot has been published yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Let requests through without a revocation check.
    #[default]
    Open,
    /// Deny requests until a CRL has been loaded.
    Closed,
}

/// Outcome of an allowed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The leaf serial is not on the revocation list.
    Allowed,
    /// No revocation data was available and the gate fails open.
    Unchecked,
}

/// Identity details of a client certificate, used for audit logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub common_name: String,
    pub emails: Vec<String>,
    pub serial: SerialNumber,
}

impl PeerIdentity {
    pub fn from_certificate(cert: &X509Certificate<'_>) -> Self {
        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string();

        let emails = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::RFC822Name(email) => Some(email.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!(error = %e, "Unreadable subjectAltName extension");
                Vec::new()
            }
        };

        Self {
            common_name,
            emails,
            serial: SerialNumber::from(&cert.tbs_certificate.serial),
        }
    }

    /// SAN e-mail identities formatted as `Email:a@b, Email:c@d`
    pub fn sans(&self) -> String {
        self.emails
            .iter()
            .map(|email| format!("Email:{email}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CN={}, SANs={}, Serial Number: {}",
            self.common_name,
            self.sans(),
            self.serial
        )
    }
}

/// Reasons a request is denied
#[derive(Error, Debug)]
pub enum GateError {
    #[error("TLS client certificate is required for authentication.")]
    AuthenticationRequired,

    #[error("Certificate is revoked.")]
    CertificateRevoked(PeerIdentity),

    #[error("TLS client certificate could not be decoded.")]
    InvalidCertificate,

    #[error("Certificate revocation status is unavailable.")]
    RevocationUnavailable,
}

/// Allow/deny decision for TLS-authenticated requests
#[derive(Debug, Clone)]
pub struct RequestGate {
    store: Arc<RevocationStore>,
    fail_mode: FailMode,
}

impl RequestGate {
    pub fn new(store: Arc<RevocationStore>) -> Self {
        Self {
            store,
            fail_mode: FailMode::default(),
        }
    }

    pub fn with_fail_mode(mut self, fail_mode: FailMode) -> Self {
        self.fail_mode = fail_mode;
        self
    }

    pub fn fail_mode(&self) -> FailMode {
        self.fail_mode
    }

    /// Decide whether a request presenting `chain` may proceed.
    ///
    /// `chain` holds DER certificates ordered leaf first.
    pub fn check<C: AsRef<[u8]>>(&self, chain: &[C]) -> Result<Verdict, GateError> {
        let Some(leaf) = chain.first() else {
            return Err(GateError::AuthenticationRequired);
        };

        let Some(snapshot) = self.store.current() else {
            return match self.fail_mode {
                FailMode::Open => {
                    warn!("CRL data is not available. Proceeding without CRL checks.");
                    Ok(Verdict::Unchecked)
                }
                FailMode::Closed => {
                    warn!("CRL data is not available. Rejecting request.");
                    Err(GateError::RevocationUnavailable)
                }
            };
        };

        let (_, cert) = X509Certificate::from_der(leaf.as_ref()).map_err(|e| {
            warn!(error = %e, "Failed to decode client certificate");
            GateError::InvalidCertificate
        })?;

        let serial = SerialNumber::from(&cert.tbs_certificate.serial);
        if snapshot.is_revoked(&serial) {
            let identity = PeerIdentity::from_certificate(&cert);
            warn!(
                target: "crl_gate::audit",
                cn = %identity.common_name,
                sans = %identity.sans(),
                serial = %identity.serial,
                "Revoked certificate detected: {identity}"
            );
            return Err(GateError::CertificateRevoked(identity));
        }

        Ok(Verdict::Allowed)
    }
}
