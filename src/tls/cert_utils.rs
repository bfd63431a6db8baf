//! Certificate generation helpers for tests and local setups.

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::{X509, X509Builder, X509Name, X509NameBuilder};

/// PEM material for a CA-signed server certificate.
#[derive(Debug, Clone)]
pub struct TestCertificates {
    pub server_cert: Vec<u8>,
    pub server_key: Vec<u8>,
    pub ca_cert: Vec<u8>,
}

/// PEM material for a client certificate together with its DER encoding.
#[derive(Debug, Clone)]
pub struct ClientCertificate {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
    pub cert_der: Vec<u8>,
}

impl ClientCertificate {
    /// Certificate followed by its private key, the layout HTTP clients expect for an identity.
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut combined = self.cert_pem.clone();
        combined.extend_from_slice(b"\n");
        combined.extend_from_slice(&self.key_pem);
        combined
    }
}

/// Generate a CA plus a `localhost` server certificate signed by it.
pub fn generate_test_certificates() -> Result<TestCertificates, ErrorStack> {
    let (ca_cert, ca_key) = generate_ca_certificate()?;
    let (server_cert, server_key) = generate_server_certificate(&ca_cert, &ca_key)?;

    Ok(TestCertificates {
        server_cert,
        server_key,
        ca_cert: ca_cert.to_pem()?,
    })
}

pub fn generate_ca_certificate() -> Result<(X509, PKey<Private>), ErrorStack> {
    let key_pair = generate_key()?;
    let subject_name = create_x509_name(&[("O", "CRL Gate Test"), ("CN", "Test Root CA")])?;

    let mut cert_builder = base_builder(&subject_name, &subject_name, &key_pair, &random_serial()?)?;
    cert_builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    cert_builder.append_extension(
        KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .build()?,
    )?;
    cert_builder.sign(&key_pair, MessageDigest::sha256())?;

    Ok((cert_builder.build(), key_pair))
}

/// Server certificate for `localhost` in PEM, with its PKCS#8 key.
pub fn generate_server_certificate(
    ca_cert: &X509,
    ca_key: &PKey<Private>,
) -> Result<(Vec<u8>, Vec<u8>), ErrorStack> {
    let key_pair = generate_key()?;
    let subject_name = create_x509_name(&[("O", "CRL Gate Test"), ("CN", "localhost")])?;

    let mut cert_builder =
        base_builder(&subject_name, ca_cert.subject_name(), &key_pair, &random_serial()?)?;
    cert_builder.append_extension(BasicConstraints::new().build()?)?;
    cert_builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&cert_builder.x509v3_context(Some(ca_cert), None))?;
    cert_builder.append_extension(san)?;
    cert_builder.sign(ca_key, MessageDigest::sha256())?;

    Ok((
        cert_builder.build().to_pem()?,
        key_pair.private_key_to_pem_pkcs8()?,
    ))
}

/// Client certificate with a fixed serial number and optional SAN e-mail identities.
pub fn generate_client_certificate(
    ca_cert: &X509,
    ca_key: &PKey<Private>,
    serial: &[u8],
    common_name: &str,
    emails: &[&str],
) -> Result<ClientCertificate, ErrorStack> {
    let key_pair = generate_key()?;
    let subject_name = create_x509_name(&[("O", "CRL Gate Test"), ("CN", common_name)])?;
    let serial = BigNum::from_slice(serial)?.to_asn1_integer()?;

    let mut cert_builder = base_builder(&subject_name, ca_cert.subject_name(), &key_pair, &serial)?;
    cert_builder.append_extension(BasicConstraints::new().build()?)?;
    cert_builder.append_extension(ExtendedKeyUsage::new().client_auth().build()?)?;
    if !emails.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for email in emails {
            san.email(email);
        }
        let san = san.build(&cert_builder.x509v3_context(Some(ca_cert), None))?;
        cert_builder.append_extension(san)?;
    }
    cert_builder.sign(ca_key, MessageDigest::sha256())?;

    let cert = cert_builder.build();
    Ok(ClientCertificate {
        cert_pem: cert.to_pem()?,
        key_pem: key_pair.private_key_to_pem_pkcs8()?,
        cert_der: cert.to_der()?,
    })
}

fn base_builder(
    subject: &openssl::x509::X509NameRef,
    issuer: &openssl::x509::X509NameRef,
    key_pair: &PKey<Private>,
    serial: &Asn1Integer,
) -> Result<X509Builder, ErrorStack> {
    let mut cert_builder = X509Builder::new()?;
    cert_builder.set_version(2)?;
    cert_builder.set_serial_number(serial)?;
    cert_builder.set_subject_name(subject)?;
    cert_builder.set_issuer_name(issuer)?;
    cert_builder.set_pubkey(key_pair)?;

    // Set validity period (1 year)
    let not_before = Asn1Time::days_from_now(0)?;
    let not_after = Asn1Time::days_from_now(365)?;
    cert_builder.set_not_before(&not_before)?;
    cert_builder.set_not_after(&not_after)?;

    Ok(cert_builder)
}

fn generate_key() -> Result<PKey<Private>, ErrorStack> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
    PKey::from_ec_key(EcKey::generate(&group)?)
}

fn random_serial() -> Result<Asn1Integer, ErrorStack> {
    let mut serial = BigNum::new()?;
    serial.rand(127, MsbOption::MAYBE_ZERO, false)?;
    serial.to_asn1_integer()
}

fn create_x509_name(entries: &[(&str, &str)]) -> Result<X509Name, ErrorStack> {
    let mut name_builder = X509NameBuilder::new()?;
    for (key, value) in entries {
        name_builder.append_entry_by_text(key, value)?;
    }
    Ok(name_builder.build())
}
