use anyhow::Context;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use opencds::{
    config::{default_config_path, AppConfig, Args},
    logging, platform,
    state::AppState,
    watcher::{CatalogInvalidator, MediaWatcher},
    web,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_args(&args)?;

    logging::init_logging_with_options(Some(&config.logging.level), args.debug)
        .context("Failed to initialize logging")?;

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let addresses = platform::advertised_addresses(&config.network);
    logging::log_startup_info(&config, &config_path, &addresses);

    let bind_ip: IpAddr = config
        .server
        .interface
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.interface))?;
    let addr = SocketAddr::new(bind_ip, config.server.port);
    let (app_state, _watcher) = start_catalog(config, addresses)?;

    let app = web::create_router(app_state);
    let started = Instant::now();

    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    logging::log_shutdown_info(started.elapsed().as_secs());
    Ok(())
}

/// Build the shared state and, when configured, the media watcher. The
/// returned watcher stops when dropped, so it must live until shutdown. If it
/// cannot start, the state is rebuilt without listing caching.
fn start_catalog(
    mut config: AppConfig,
    addresses: Vec<IpAddr>,
) -> anyhow::Result<(AppState, Option<MediaWatcher>)> {
    let app_state = AppState::from_config(config.clone(), addresses.clone())
        .context("Failed to open media root")?;
    if !config.media.watch_for_changes {
        return Ok((app_state, None));
    }

    let invalidator = CatalogInvalidator::new(
        app_state.generation.clone(),
        app_state.cache.clone(),
        app_state.browser.device_id(),
    );
    match MediaWatcher::start(
        app_state.browser.resolver().root(),
        invalidator,
        Duration::from_millis(500),
    ) {
        Ok((watcher, mut events)) => {
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    tracing::debug!("Media change: {:?}", event);
                }
            });
            Ok((app_state, Some(watcher)))
        }
        Err(e) => {
            warn!(
                "File system watcher unavailable, SystemUpdateID will stay fixed and listings are not cached: {}",
                e
            );
            config.media.watch_for_changes = false;
            let app_state = AppState::from_config(config, addresses)
                .context("Failed to open media root")?;
            Ok((app_state, None))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
