//! Certificate Revocation List (CRL) store
//!
//! # Features
//! - Loading concatenated PEM CRL files from disk
//! - Lock-free publication of immutable revoked-serial snapshots
//! - Modification-time polling that reloads the store when the file changes

mod errors;
mod parser;
mod store;
mod types;
pub mod watcher;

// Re-export public types
pub use errors::{CrlError, CrlResult};
pub use parser::{CrlBundle, parse_crl_bundle};
pub use store::{DEFAULT_MAX_FILE_BYTES, RevocationStore};
pub use types::{SerialNumber, Snapshot};
pub use watcher::{CrlWatcher, DEFAULT_POLL_INTERVAL, PollOutcome};
