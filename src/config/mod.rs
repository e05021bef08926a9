use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub mod validation;

use validation::ConfigValidator;

/// Main application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Bind address for the HTTP listener.
    pub interface: String,
    pub name: String,
    #[serde(default = "generate_uuid")]
    pub uuid: String,
}

/// Addresses advertised in resource URIs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Explicit IPv4 addresses; empty means detect every up, non-loopback interface.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub include_loopback: bool,
}

/// Media configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: String,
    /// Compute childCount for containers listed by BrowseDirectChildren.
    #[serde(default)]
    pub count_children: bool,
    /// Per-page cap applied on top of RequestedCount; 0 is unbounded.
    #[serde(default = "default_max_returned_items")]
    pub max_returned_items: u32,
    #[serde(default = "default_true")]
    pub cache_listings: bool,
    #[serde(default = "default_true")]
    pub watch_for_changes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn default_max_returned_items() -> u32 {
    200
}

fn default_true() -> bool {
    true
}

/// Command line arguments. Values given here override the configuration file.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The directory containing media files to serve
    pub media_dir: Option<String>,

    /// The network port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// The friendly name for the media server
    #[arg(short, long)]
    pub name: Option<String>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from file or create with defaults
    pub fn load_or_create<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let default_config = Self::default();
            default_config.save_to_file(config_path).with_context(|| {
                format!(
                    "Failed to create default configuration file at: {}",
                    config_path.display()
                )
            })?;

            tracing::info!("Created default configuration file at: {}", config_path.display());
            Ok(default_config)
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let body = toml::to_string_pretty(self)
            .context("Failed to serialize configuration to TOML")?;
        let content = format!("# OpenCDS media server configuration\n\n{}", body);

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Apply command line overrides on top of the loaded file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(dir) = &args.media_dir {
            self.media.root = dir.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(name) = &args.name {
            self.server.name = name.clone();
        }
        if args.debug {
            self.logging.level = "debug".to_string();
        }
    }

    /// Load, override from the command line, then validate.
    pub fn from_args(args: &Args) -> Result<Self> {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => default_config_path(),
        };

        let mut config = Self::load_or_create(&path)?;
        config.apply_args(args);
        ConfigValidator::validate(&config)
            .with_context(|| format!("Invalid configuration (from {})", path.display()))?;

        Ok(config)
    }

    pub fn media_root(&self) -> PathBuf {
        PathBuf::from(&self.media.root)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "Unknown".to_string());

        let root = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .to_string_lossy()
            .to_string();

        Self {
            server: ServerConfig {
                port: 8200,
                interface: "0.0.0.0".to_string(),
                name: format!("{}: Media Server", hostname),
                uuid: generate_uuid(),
            },
            network: NetworkConfig::default(),
            media: MediaConfig {
                root,
                count_children: false,
                max_returned_items: default_max_returned_items(),
                cache_listings: true,
                watch_for_changes: true,
            },
            logging: LoggingConfig::default(),
        }
    }
}

/// `<config dir>/opencds/config.toml`, or the working directory when there is none.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("opencds"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}
