use std::collections::HashSet;
use std::fmt;
use std::time::SystemTime;

use x509_parser::num_bigint::BigUint;

/// Certificate serial number in canonical form.
///
/// Stored as the big-endian magnitude without leading zero bytes, so the same
/// integer always compares equal regardless of how its DER encoding was padded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    /// Build a serial number from big-endian bytes.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        let first = bytes.iter().position(|b| *b != 0);
        match first {
            Some(idx) => Self(bytes[idx..].to_vec()),
            None => Self(vec![0]),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Colon separated upper-case hex pairs, e.g. `0A:1B:2C`.
    pub fn to_colon_hex(&self) -> String {
        let hex = hex::encode_upper(&self.0);
        hex.as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl From<&BigUint> for SerialNumber {
    fn from(value: &BigUint) -> Self {
        Self::from_bytes_be(&value.to_bytes_be())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_colon_hex())
    }
}

/// Immutable view of the revoked serial numbers loaded from one CRL file state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    revoked: HashSet<SerialNumber>,
    source_modified: SystemTime,
    crl_count: usize,
}

impl Snapshot {
    pub fn new(
        revoked: HashSet<SerialNumber>,
        source_modified: SystemTime,
        crl_count: usize,
    ) -> Self {
        Self {
            revoked,
            source_modified,
            crl_count,
        }
    }

    pub fn is_revoked(&self, serial: &SerialNumber) -> bool {
        self.revoked.contains(serial)
    }

    /// Modification time of the file this snapshot was built from
    pub fn source_modified(&self) -> SystemTime {
        self.source_modified
    }

    /// Number of CRL blocks that contributed to this snapshot
    pub fn crl_count(&self) -> usize {
        self.crl_count
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }

    pub fn serials(&self) -> impl Iterator<Item = &SerialNumber> {
        self.revoked.iter()
    }
}
