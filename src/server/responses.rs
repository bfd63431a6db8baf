use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::gate::GateError;

impl GateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::RevocationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GateError::AuthenticationRequired
            | GateError::CertificateRevoked(_)
            | GateError::InvalidCertificate => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
