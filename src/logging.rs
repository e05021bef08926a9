use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::platform::PlatformError;

/// Build the level filter. `RUST_LOG` wins, then the configured level, then `debug`/`info`.
pub fn build_filter(log_level: Option<&str>, debug: bool) -> Result<EnvFilter, PlatformError> {
    let default_level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or(default_level)))
        .map_err(|e| PlatformError::Logging(format!("Invalid log level: {}", e)))
}

/// Install the global tracing subscriber.
pub fn init_logging_with_options(log_level: Option<&str>, debug: bool) -> Result<(), PlatformError> {
    let filter = build_filter(log_level, debug)?;
    let level = log_level.unwrap_or(if debug { "debug" } else { "info" });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| PlatformError::Logging(e.to_string()))?;

    info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Log what the server is about to serve and where.
pub fn log_startup_info(config: &AppConfig, config_path: &Path, addresses: &[IpAddr]) {
    info!("=== OpenCDS Media Server Starting ===");
    info!("Configuration file: {}", config_path.display());
    info!("Friendly name: {}", config.server.name);
    info!("Device UUID: {}", config.server.uuid);
    info!("Media root: {}", config.media.root);
    info!(
        "Listing options: count_children={}, max_returned_items={}, cache_listings={}",
        config.media.count_children, config.media.max_returned_items, config.media.cache_listings
    );

    for ip in addresses {
        info!("  - http://{}:{}/description.xml", ip, config.server.port);
    }

    if !config.media.watch_for_changes {
        warn!("File system watcher is disabled: SystemUpdateID will not change and listings are not cached");
    }
}

pub fn log_shutdown_info(uptime_seconds: u64) {
    info!("=== OpenCDS Media Server Shutting Down ===");
    let uptime_hours = uptime_seconds / 3600;
    let uptime_minutes = (uptime_seconds % 3600) / 60;
    info!("Total uptime: {}h {}m", uptime_hours, uptime_minutes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        assert!(build_filter(Some("opencds=trace,axum=info"), false).is_ok());
        assert!(build_filter(None, true).is_ok());
    }

    #[test]
    fn test_init_logging_once() {
        let _ = init_logging_with_options(None, true);
        let err = init_logging_with_options(Some("info"), false).unwrap_err();
        assert!(matches!(err, PlatformError::Logging(_)));
    }
}
