use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::gate::{GateError, RequestGate};
use crate::tls::PeerCertificates;

/// Reject requests whose client certificate is revoked.
///
/// A request without a [`PeerCertificates`] extension is treated as having
/// presented no certificate.
pub async fn crl_check(
    State(gate): State<Arc<RequestGate>>,
    request: Request,
    next: Next,
) -> Result<Response, GateError> {
    let peers = request
        .extensions()
        .get::<PeerCertificates>()
        .cloned()
        .unwrap_or_default();

    let verdict = gate.check(peers.as_slice())?;
    debug!(?verdict, uri = %request.uri(), "Request passed revocation check");

    Ok(next.run(request).await)
}
