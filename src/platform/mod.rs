use std::net::IpAddr;
use thiserror::Error;

pub mod network;

pub use network::{advertised_addresses, detect_interfaces};

/// Platform-level failures: interface detection and logging setup
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Network configuration error: {0}")]
    NetworkConfig(String),

    #[error("Invalid logging configuration: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// A local interface address usable in resource URIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub ip_address: IpAddr,
    pub is_loopback: bool,
    pub is_up: bool,
}
