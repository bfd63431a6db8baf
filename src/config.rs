use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::gate::FailMode;
use crate::pki::crl::DEFAULT_MAX_FILE_BYTES;

pub const DEFAULT_CRL_PATH: &str = "/pki/crl/crl.pem";
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub tls: Option<TlsSettings>,
    pub crl: CrlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Locations of the PEM files used by the TLS listener.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub client_ca_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrlConfig {
    #[serde(default)]
    file_path: String,
    pub poll_interval_secs: u64,
    pub max_file_bytes: u64,
    #[serde(default)]
    pub fail_mode: FailMode,
}

impl CrlConfig {
    /// Path of the CRL file. An empty setting falls back to [`DEFAULT_CRL_PATH`].
    pub fn file_path(&self) -> PathBuf {
        let trimmed = self.file_path.trim();
        if trimmed.is_empty() {
            PathBuf::from(DEFAULT_CRL_PATH)
        } else {
            PathBuf::from(trimmed)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs).max(MIN_POLL_INTERVAL)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("server.host", "localhost")?
            .set_default("server.port", 3000)?
            .set_default("crl.file_path", DEFAULT_CRL_PATH)?
            .set_default("crl.poll_interval_secs", 60)?
            .set_default("crl.max_file_bytes", DEFAULT_MAX_FILE_BYTES)?
            .set_default("crl.fail_mode", "open")?
            .add_source(File::with_name("config/settings").required(false));

        // Explicit overrides replace the process environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. APP_SERVER__PORT or APP_CRL__FILE_PATH
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
