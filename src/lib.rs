pub mod cache;
pub mod catalog;
pub mod config;
pub mod didl;
pub mod dlna;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod platform;
pub mod watcher;
pub mod web;

pub mod state {
    use crate::{
        cache::MediaCache,
        catalog::{BrowseOptions, CatalogBrowser, Generation, ObjectIdResolver},
        config::AppConfig,
        metadata::MetadataHandlerRegistry,
        web::resource::ResourceServer,
    };
    use std::net::IpAddr;
    use std::sync::Arc;

    /// Everything a request handler needs, built once at startup.
    #[derive(Clone)]
    pub struct AppState {
        pub config: Arc<AppConfig>,
        pub browser: Arc<CatalogBrowser>,
        pub resources: ResourceServer,
        pub generation: Arc<Generation>,
        pub cache: Arc<MediaCache>,
    }

    impl AppState {
        /// Wire the catalog and resource server for `config.media.root`, emitting
        /// resource URIs for `addresses`.
        ///
        /// Only the watcher invalidates cached listings, so listings are cached
        /// only when `watch_for_changes` is set as well as `cache_listings`.
        pub fn from_config(config: AppConfig, addresses: Vec<IpAddr>) -> std::io::Result<Self> {
            let resolver = ObjectIdResolver::new(config.media_root())?;
            let registry = Arc::new(MetadataHandlerRegistry::with_defaults());
            let generation = Arc::new(Generation::new());
            let cache = Arc::new(MediaCache::new());

            let options = BrowseOptions {
                count_children: config.media.count_children,
                max_returned_items: config.media.max_returned_items,
                cache_listings: config.media.cache_listings && config.media.watch_for_changes,
            };

            let browser = CatalogBrowser::new(
                resolver.clone(),
                registry.clone(),
                generation.clone(),
                cache.clone(),
            )
            .with_device_id(config.server.uuid.clone())
            .with_endpoints(addresses, config.server.port)
            .with_options(options);

            Ok(AppState {
                resources: ResourceServer::new(resolver, registry),
                browser: Arc::new(browser),
                generation,
                cache,
                config: Arc::new(config),
            })
        }
    }
}
