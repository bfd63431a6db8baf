pub mod config;
pub mod gate;
pub mod pki;
pub mod server;
pub mod telemetry;
pub mod tls;
