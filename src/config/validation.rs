use anyhow::{anyhow, Context, Result};
use std::net::IpAddr;
use std::path::Path;
use uuid::Uuid;

use super::AppConfig;

/// Configuration validator for ensuring configuration integrity
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        Self::validate_server_config(config)?;
        Self::validate_network_config(config)?;
        Self::validate_media_config(config)?;
        Ok(())
    }

    fn validate_server_config(config: &AppConfig) -> Result<()> {
        if config.server.port == 0 {
            return Err(anyhow!("Server port cannot be 0"));
        }

        config
            .server
            .interface
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid server interface address: {}", config.server.interface))?;

        if config.server.name.trim().is_empty() {
            return Err(anyhow!("Server name cannot be empty"));
        }

        Uuid::parse_str(&config.server.uuid)
            .with_context(|| format!("Invalid UUID format: {}", config.server.uuid))?;

        Ok(())
    }

    fn validate_network_config(config: &AppConfig) -> Result<()> {
        for interface in &config.network.interfaces {
            interface
                .parse::<IpAddr>()
                .with_context(|| format!("Invalid advertised address: {}", interface))?;
        }
        Ok(())
    }

    fn validate_media_config(config: &AppConfig) -> Result<()> {
        let root = Path::new(&config.media.root);
        if !root.exists() {
            return Err(anyhow!("Media directory does not exist: {}", root.display()));
        }
        if !root.is_dir() {
            return Err(anyhow!("Media path is not a directory: {}", root.display()));
        }
        Ok(())
    }
}
