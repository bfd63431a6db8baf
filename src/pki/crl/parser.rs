use std::collections::HashSet;

use tracing::debug;
use x509_parser::nom;
use x509_parser::prelude::*;

use super::errors::{CrlError, CrlResult};
use super::types::SerialNumber;

/// Revoked serials collected from a PEM bundle
#[derive(Debug, Default)]
pub struct CrlBundle {
    pub serials: HashSet<SerialNumber>,
    /// Number of CRL blocks found in the bundle
    pub blocks: usize,
}

const BEGIN_MARKER: &[u8] = b"-----BEGIN ";

/// Parse a buffer holding zero or more concatenated PEM-encoded CRLs.
///
/// Blocks are decoded in file order and every block must be a valid
/// CertificateList, otherwise the whole bundle is rejected. Bytes outside of
/// `-----BEGIN`/`-----END` framing are ignored whatever their encoding, and a
/// buffer without any block yields an empty bundle.
pub fn parse_crl_bundle(data: &[u8]) -> CrlResult<CrlBundle> {
    let mut bundle = CrlBundle::default();

    for (block, raw) in pem_blocks(data).enumerate() {
        let (_, pem) = parse_x509_pem(raw).map_err(|e| CrlError::Pem {
            block,
            source: pem_error(e),
        })?;

        let (_, crl) = CertificateRevocationList::from_der(&pem.contents).map_err(|e| {
            CrlError::Parse {
                block,
                source: e.into(),
            }
        })?;

        let before = bundle.serials.len();
        bundle.serials.extend(
            crl.iter_revoked_certificates()
                .map(|revoked| SerialNumber::from(revoked.serial())),
        );
        bundle.blocks += 1;

        debug!(
            block,
            label = %pem.label,
            issuer = %crl.issuer(),
            added = bundle.serials.len() - before,
            "Parsed CRL block"
        );
    }

    Ok(bundle)
}

/// Byte ranges each starting at a BEGIN marker and ending right before the next one.
fn pem_blocks(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut next = find_begin(data, 0);
    std::iter::from_fn(move || {
        let start = next?;
        next = find_begin(data, start + BEGIN_MARKER.len());
        Some(&data[start..next.unwrap_or(data.len())])
    })
}

fn find_begin(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(BEGIN_MARKER.len())
        .position(|window| window == BEGIN_MARKER)
        .map(|offset| from + offset)
}

fn pem_error(e: nom::Err<PEMError>) -> PEMError {
    match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => PEMError::IncompletePEM,
    }
}
