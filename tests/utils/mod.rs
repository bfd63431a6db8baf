use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::Handle;
use crl_gate::config::Config;
use crl_gate::gate::RequestGate;
use crl_gate::pki::crl::RevocationStore;
use crl_gate::server::Server;
use crl_gate::telemetry;
use crl_gate::tls::{
    ClientCertificate, TlsConfig, generate_ca_certificate, generate_client_certificate,
};
use tempfile::TempDir;

/// Revokes `0A:1B:2C` and `01`.
#[allow(dead_code)]
pub const ISSUER_A: &[u8] = include_bytes!("../../test_data/crl/issuer_a.pem");
/// Revokes `7F` and `01:00:FF`.
#[allow(dead_code)]
pub const ISSUER_B: &[u8] = include_bytes!("../../test_data/crl/issuer_b.pem");
/// Valid CRL without revoked entries.
#[allow(dead_code)]
pub const EMPTY_CRL: &[u8] = include_bytes!("../../test_data/crl/empty.pem");

#[allow(dead_code)]
pub fn write_crl(dir: &Path, contents: &[u8]) -> PathBuf {
    let path = dir.join("crl.pem");
    std::fs::write(&path, contents).unwrap();
    path
}

/// Store published from `contents`, with the scratch directory that holds the file.
#[allow(dead_code)]
pub async fn loaded_store(contents: &[u8]) -> (TempDir, PathBuf, Arc<RevocationStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_crl(dir.path(), contents);
    let store = Arc::new(RevocationStore::default());
    store.reload(&path).await.unwrap();
    (dir, path, store)
}

/// Client certificate issued by a throwaway CA.
#[allow(dead_code)]
pub fn client_certificate(serial: &[u8], common_name: &str, emails: &[&str]) -> ClientCertificate {
    let (ca_cert, ca_key) = generate_ca_certificate().unwrap();
    generate_client_certificate(&ca_cert, &ca_key, serial, common_name, emails).unwrap()
}

/// Start the HTTPS server on an ephemeral port and return its port and shutdown handle.
#[allow(dead_code)]
pub async fn spawn_server(gate: Arc<RequestGate>, tls_config: TlsConfig) -> (u16, Handle) {
    telemetry::init_tracing();

    let config = {
        let mut config = Config::load_with_sources(Some(Default::default())).unwrap();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config
    };

    let server = Server::new(gate, &config.server, &tls_config).unwrap();
    let port = server.port();
    let handle = server.handle();
    tokio::spawn(server.run());

    (port, handle)
}
