//! Stand-in for the service sitting behind the gate.

use axum::Extension;
use x509_parser::prelude::*;

use crate::gate::PeerIdentity;
use crate::tls::PeerCertificates;

/// Greets the caller by the common name of its client certificate.
pub async fn echo_identity(peers: Option<Extension<PeerCertificates>>) -> String {
    let common_name = peers
        .as_ref()
        .and_then(|Extension(peers)| peers.leaf())
        .and_then(|der| X509Certificate::from_der(der).ok())
        .map(|(_, cert)| PeerIdentity::from_certificate(&cert).common_name)
        .unwrap_or_default();

    format!("Hello, {common_name}")
}
