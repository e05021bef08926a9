//! Filesystem-backed ContentDirectory catalog.

pub mod builder;
pub mod generation;
pub mod object_id;
pub mod search;
pub mod sort;

pub use builder::ObjectBuilder;
pub use generation::Generation;
pub use object_id::{ObjectIdResolver, ResolveError};

use crate::cache::{self, MediaCache, MediaObjectList};
use crate::didl::{self, FilterMask};
use crate::dlna::ClientContext;
use crate::error::ActionError;
use crate::metadata::MetadataHandlerRegistry;
use crate::model::MediaObject;
use search::SearchExpr;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseFlag {
    Metadata,
    DirectChildren,
}

impl FromStr for BrowseFlag {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BrowseMetadata" => Ok(BrowseFlag::Metadata),
            "BrowseDirectChildren" => Ok(BrowseFlag::DirectChildren),
            other => Err(ActionError::InvalidArgs(format!("BrowseFlag '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseOptions {
    /// Fill `childCount` for child containers during BrowseDirectChildren.
    pub count_children: bool,
    /// Upper bound on NumberReturned; 0 means unbounded.
    pub max_returned_items: u32,
    /// Keep built child listings in the MediaCache until the catalog changes.
    pub cache_listings: bool,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        BrowseOptions {
            count_children: false,
            max_returned_items: 0,
            cache_listings: true,
        }
    }
}

/// Output arguments shared by Browse and Search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseResult {
    pub didl: String,
    pub number_returned: u32,
    pub total_matches: u32,
    pub update_id: u32,
}

/// Answers Browse and Search against a directory tree.
///
/// All methods do blocking filesystem I/O; async callers should run them on
/// a blocking thread.
#[derive(Debug)]
pub struct CatalogBrowser {
    resolver: ObjectIdResolver,
    registry: Arc<MetadataHandlerRegistry>,
    generation: Arc<Generation>,
    cache: Arc<MediaCache>,
    device_id: String,
    addresses: Vec<IpAddr>,
    port: u16,
    options: BrowseOptions,
}

impl CatalogBrowser {
    pub fn new(
        resolver: ObjectIdResolver,
        registry: Arc<MetadataHandlerRegistry>,
        generation: Arc<Generation>,
        cache: Arc<MediaCache>,
    ) -> Self {
        CatalogBrowser {
            resolver,
            registry,
            generation,
            cache,
            device_id: String::new(),
            addresses: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
            port: 8200,
            options: BrowseOptions::default(),
        }
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Addresses and port used to build resource URIs.
    pub fn with_endpoints(mut self, addresses: Vec<IpAddr>, port: u16) -> Self {
        if !addresses.is_empty() {
            self.addresses = addresses;
        }
        self.port = port;
        self
    }

    pub fn with_options(mut self, options: BrowseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(&self) -> &ObjectIdResolver {
        &self.resolver
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn system_update_id(&self) -> u32 {
        self.generation.current()
    }

    fn builder<'a>(&'a self, client: &'a ClientContext) -> ObjectBuilder<'a> {
        ObjectBuilder {
            resolver: &self.resolver,
            registry: &self.registry,
            addresses: &self.addresses,
            port: self.port,
            client,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn browse(
        &self,
        object_id: &str,
        flag: BrowseFlag,
        filter: &str,
        starting_index: u32,
        requested_count: u32,
        sort_criteria: &str,
        client: &ClientContext,
    ) -> Result<BrowseResult, ActionError> {
        match flag {
            BrowseFlag::Metadata => {
                sort::parse_sort(sort_criteria)?;
                self.browse_metadata(object_id, filter, client)
            }
            BrowseFlag::DirectChildren => self.browse_direct_children(
                object_id,
                filter,
                starting_index,
                requested_count,
                sort_criteria,
                client,
            ),
        }
    }

    pub fn browse_metadata(
        &self,
        object_id: &str,
        filter: &str,
        client: &ClientContext,
    ) -> Result<BrowseResult, ActionError> {
        let mask = FilterMask::parse(filter);
        let path = self.resolver.to_path(object_id).map_err(|_| {
            debug!(object_id = %object_id, "BrowseMetadata target not found");
            ActionError::NoSuchObject
        })?;

        let object = self
            .builder(client)
            .build(&path, mask.contains(FilterMask::CHILDCOUNT))
            .ok_or(ActionError::NoSuchObject)?;

        Ok(BrowseResult {
            didl: didl::wrap_didl(&didl::to_didl(&object, mask)),
            number_returned: 1,
            total_matches: 1,
            update_id: self.system_update_id(),
        })
    }

    pub fn browse_direct_children(
        &self,
        object_id: &str,
        filter: &str,
        starting_index: u32,
        requested_count: u32,
        sort_criteria: &str,
        client: &ClientContext,
    ) -> Result<BrowseResult, ActionError> {
        let path = self.container_path(object_id)?;
        let criteria = sort::parse_sort(sort_criteria)?;
        let mask = FilterMask::parse(filter);
        let with_count = self.options.count_children && mask.contains(FilterMask::CHILDCOUNT);

        let children = self.children_of(object_id, &path, with_count, client)?;
        if criteria.is_empty() {
            return Ok(self.page(&children, mask, starting_index, requested_count));
        }

        let mut ordered = children.to_vec();
        sort::sort_objects(&mut ordered, &criteria);
        Ok(self.page(&ordered, mask, starting_index, requested_count))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        container_id: &str,
        search_criteria: &str,
        filter: &str,
        starting_index: u32,
        requested_count: u32,
        sort_criteria: &str,
        client: &ClientContext,
    ) -> Result<BrowseResult, ActionError> {
        let criteria = search_criteria.trim();
        if criteria.is_empty() || criteria == "*" {
            return self.browse_direct_children(
                container_id,
                filter,
                starting_index,
                requested_count,
                sort_criteria,
                client,
            );
        }

        let path = self.container_path(container_id)?;
        let sort_order = sort::parse_sort(sort_criteria)?;
        let expr = search::parse_search(criteria)?;
        let mask = FilterMask::parse(filter);

        let mut matches = Vec::new();
        self.search_tree(&path, &expr, client, &mut matches);
        sort::sort_objects(&mut matches, &sort_order);

        Ok(self.page(&matches, mask, starting_index, requested_count))
    }

    fn container_path(&self, object_id: &str) -> Result<PathBuf, ActionError> {
        let path = self.resolver.to_path(object_id).map_err(|_| {
            debug!(object_id = %object_id, "Container not found");
            ActionError::NoSuchContainer
        })?;
        if !path.is_dir() {
            return Err(ActionError::NoSuchContainer);
        }
        Ok(path)
    }

    /// Every valid child of a directory in enumeration order, cached when enabled.
    fn children_of(
        &self,
        object_id: &str,
        path: &Path,
        with_count: bool,
        client: &ClientContext,
    ) -> Result<MediaObjectList, ActionError> {
        let item_key = cache::variant_key(
            object_id,
            &format!("{}#{}", client.cache_key(&self.addresses), with_count),
        );
        if self.options.cache_listings {
            if let Some(cached) = self.cache.get(&self.device_id, &item_key) {
                debug!(object_id = %object_id, "Serving listing from cache");
                return Ok(cached);
            }
        }

        let builder = self.builder(client);
        let entries = fs::read_dir(path).map_err(|e| {
            warn!("Failed to list {}: {}", path.display(), e);
            ActionError::Internal(e.to_string())
        })?;

        let children: Vec<MediaObject> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| builder.build(&entry.path(), with_count))
            .collect();
        let children = Arc::new(children);

        if self.options.cache_listings {
            self.cache.put(&self.device_id, &item_key, children.clone());
        }
        Ok(children)
    }

    /// Depth-first walk of the subtree below `dir`, collecting matching objects.
    fn search_tree(
        &self,
        dir: &Path,
        expr: &SearchExpr,
        client: &ClientContext,
        matches: &mut Vec<MediaObject>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Search skipping {}: {}", dir.display(), e);
                return;
            }
        };

        let builder = self.builder(client);
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let Some(object) = builder.build(&path, false) else {
                continue;
            };
            let descend = object.is_container()
                && entry.file_type().map(|t| !t.is_symlink()).unwrap_or(false);
            if expr.matches(&object) {
                matches.push(object);
            }
            if descend {
                self.search_tree(&path, expr, client, matches);
            }
        }
    }

    /// Apply StartingIndex, RequestedCount and the configured cap, then serialize.
    fn page(
        &self,
        objects: &[MediaObject],
        mask: FilterMask,
        starting_index: u32,
        requested_count: u32,
    ) -> BrowseResult {
        let limit = match (requested_count, self.options.max_returned_items) {
            (0, max) => max,
            (count, 0) => count,
            (count, max) => count.min(max),
        };
        let take = if limit == 0 { usize::MAX } else { limit as usize };

        let mut body = String::new();
        let mut number_returned = 0u32;
        for object in objects.iter().skip(starting_index as usize).take(take) {
            didl::write_object(&mut body, object, mask);
            number_returned += 1;
        }

        BrowseResult {
            didl: didl::wrap_didl(&body),
            number_returned,
            total_matches: objects.len() as u32,
            update_id: self.system_update_id(),
        }
    }
}
