pub mod crl;

// Re-export commonly used types
pub use crl::{CrlError, CrlWatcher, RevocationStore, SerialNumber, Snapshot};
