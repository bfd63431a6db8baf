use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Context, eyre};
use crl_gate::{
    config::Config,
    gate::RequestGate,
    pki::crl::{CrlWatcher, RevocationStore},
    server::Server,
    telemetry,
    tls::TlsConfig,
};
use tokio::sync::watch;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Loaded configuration: {:?}", config);

    let crl_path = config.crl.file_path();
    let store = Arc::new(RevocationStore::new(config.crl.max_file_bytes));
    if store.reload(&crl_path).await.is_err() {
        tracing::warn!(
            path = %crl_path.display(),
            fail_mode = ?config.crl.fail_mode,
            "Starting without revocation data"
        );
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher = CrlWatcher::new(store.clone(), crl_path.clone())
        .with_interval(config.crl.poll_interval())
        .spawn(shutdown_rx);

    let gate = Arc::new(RequestGate::new(store).with_fail_mode(config.crl.fail_mode));

    let tls = config
        .tls
        .as_ref()
        .ok_or_else(|| eyre!("Missing TLS settings (tls.cert_path, tls.key_path, tls.client_ca_path)"))?;
    let tls_config = TlsConfig::from_pem_files(&tls.cert_path, &tls.key_path, &tls.client_ca_path)
        .await
        .context("Loading TLS material")?;

    let server = Server::new(gate, &config.server, &tls_config)?;
    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let result = server.run().await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = watcher.await {
        tracing::error!("CRL watcher task failed: {e}");
    }

    result
}
