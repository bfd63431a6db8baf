mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use crl_gate::gate::RequestGate;
use crl_gate::tls::{
    TlsConfig, generate_ca_certificate, generate_client_certificate, generate_server_certificate,
};
use reqwest::{Certificate, Client, Identity, StatusCode};
use utils::{ISSUER_A, loaded_store, spawn_server};

struct Harness {
    base_url: String,
    addr: SocketAddr,
    ca_pem: Vec<u8>,
    ca: (openssl::x509::X509, openssl::pkey::PKey<openssl::pkey::Private>),
    handle: axum_server::Handle,
    _crl_dir: tempfile::TempDir,
}

impl Harness {
    async fn start() -> Self {
        let (ca_cert, ca_key) = generate_ca_certificate().unwrap();
        let (server_cert, server_key) = generate_server_certificate(&ca_cert, &ca_key).unwrap();
        let ca_pem = ca_cert.to_pem().unwrap();

        let tls_config =
            TlsConfig::from_pem(server_cert, server_key).with_client_auth(vec![ca_pem.clone()]);
        let (crl_dir, _path, store) = loaded_store(ISSUER_A).await;

        let (port, handle) = spawn_server(Arc::new(RequestGate::new(store)), tls_config).await;

        Self {
            base_url: format!("https://localhost:{port}"),
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
            ca_pem,
            ca: (ca_cert, ca_key),
            handle,
            _crl_dir: crl_dir,
        }
    }

    fn client(&self, serial: Option<&[u8]>) -> Client {
        let mut builder = Client::builder()
            .add_root_certificate(Certificate::from_pem(&self.ca_pem).unwrap())
            .resolve("localhost", self.addr)
            .https_only(true);

        if let Some(serial) = serial {
            let (ca_cert, ca_key) = &self.ca;
            let client =
                generate_client_certificate(ca_cert, ca_key, serial, "mtls-client", &[]).unwrap();
            builder = builder.identity(Identity::from_pem(&client.identity_pem()).unwrap());
        }

        builder.build().unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

#[tokio::test]
async fn test_revoked_client_certificate_is_rejected() {
    let harness = Harness::start().await;

    let response = harness
        .client(Some(&[0x0A, 0x1B, 0x2C]))
        .get(format!("{}/api/orders", harness.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().await.unwrap(), "Certificate is revoked.");
}

#[tokio::test]
async fn test_valid_client_certificate_is_forwarded() {
    let harness = Harness::start().await;

    let response = harness
        .client(Some(&[0x0A, 0x1B, 0x2D]))
        .get(format!("{}/api/orders", harness.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Hello, mtls-client");
}

#[tokio::test]
async fn test_connection_without_client_certificate() {
    let harness = Harness::start().await;
    let client = harness.client(None);

    let response = client
        .get(format!("{}/api/orders", harness.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.text().await.unwrap(),
        "TLS client certificate is required for authentication."
    );

    let response = client
        .get(format!("{}/health", harness.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "healthy");
}
