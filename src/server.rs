mod handlers;
mod middleware;
mod responses;

pub use middleware::crl_check;

use std::net::TcpListener;
use std::sync::Arc;

use axum::{Router, routing::get};
use axum_server::Handle;
use axum_server::tls_openssl::{OpenSSLAcceptor, OpenSSLConfig};
use color_eyre::eyre::{Context, Result};
use handlers::echo::echo_identity;
use handlers::health::health_check;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::gate::RequestGate;
use crate::tls::{PeerCertAcceptor, TlsConfig};

/// Build the application router.
///
/// `/health` is served without a revocation check. Every other path passes
/// through [`crl_check`] before reaching the downstream handler.
pub fn router(gate: Arc<RequestGate>) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &'_ axum::extract::Request<_>| {
            let uri = request.uri().to_string();
            tracing::info_span!("request", method = %request.method(), uri)
        });

    Router::new()
        .fallback(echo_identity)
        .layer(axum::middleware::from_fn_with_state(gate, crl_check))
        .route("/health", get(health_check))
        .layer(trace_layer)
}

pub struct Server {
    router: Router,
    listener: TcpListener,
    port: u16,
    tls: OpenSSLConfig,
    handle: Handle,
}

impl Server {
    /// Bind the listener and prepare the mutual TLS acceptor.
    pub fn new(
        gate: Arc<RequestGate>,
        config: &ServerConfig,
        tls_config: &TlsConfig,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .with_context(|| format!("Binding TCP listener on {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("Setting non-blocking mode")?;
        let port = listener
            .local_addr()
            .context("Getting local address")?
            .port();

        let acceptor = tls_config
            .build_acceptor()
            .context("Building TLS acceptor")?;

        Ok(Self {
            router: router(gate),
            listener,
            port,
            tls: OpenSSLConfig::from_acceptor(Arc::new(acceptor)),
            handle: Handle::new(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle used to trigger a graceful shutdown of [`Server::run`].
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Serve HTTPS until the handle requests shutdown.
    pub async fn run(self) -> Result<()> {
        tracing::info!(port = self.port, "Server listening with mutual TLS");

        let acceptor = PeerCertAcceptor::new(OpenSSLAcceptor::new(self.tls));
        axum_server::from_tcp(self.listener)
            .acceptor(acceptor)
            .handle(self.handle)
            .serve(self.router.into_make_service())
            .await
            .context("Running HTTPS server")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
