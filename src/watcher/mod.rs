use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cache::MediaCache;
use crate::catalog::Generation;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Changes observed below the media root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSystemEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

/// Bumps the system update id and drops cached listings of one device.
#[derive(Debug, Clone)]
pub struct CatalogInvalidator {
    generation: Arc<Generation>,
    cache: Arc<MediaCache>,
    device_id: String,
}

impl CatalogInvalidator {
    pub fn new(generation: Arc<Generation>, cache: Arc<MediaCache>, device_id: impl Into<String>) -> Self {
        CatalogInvalidator {
            generation,
            cache,
            device_id: device_id.into(),
        }
    }

    /// Returns the new update id.
    pub fn invalidate(&self) -> u32 {
        self.cache.clear(&self.device_id, None);
        self.generation.bump()
    }

    /// Convert one debounced batch and invalidate once if it holds any change.
    pub fn apply_batch<'a>(
        &self,
        events: impl IntoIterator<Item = &'a notify::Event>,
    ) -> Vec<FileSystemEvent> {
        let changes: Vec<FileSystemEvent> = events.into_iter().flat_map(convert_event).collect();
        if !changes.is_empty() {
            let update_id = self.invalidate();
            info!(
                "{} change(s) under media root, SystemUpdateID is now {}",
                changes.len(),
                update_id
            );
        }
        changes
    }
}

/// Translate one notify event. Access events are not changes and yield nothing.
pub fn convert_event(event: &notify::Event) -> Vec<FileSystemEvent> {
    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_) => event
            .paths
            .iter()
            .cloned()
            .map(FileSystemEvent::Created)
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .cloned()
            .map(FileSystemEvent::Deleted)
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            vec![FileSystemEvent::Renamed {
                from: event.paths[0].clone(),
                to: event.paths[1].clone(),
            }]
        }
        _ => event
            .paths
            .iter()
            .cloned()
            .map(FileSystemEvent::Modified)
            .collect(),
    }
}

/// Recursive, debounced watcher over the media root.
pub struct MediaWatcher {
    debouncer: Option<Debouncer<RecommendedWatcher, FileIdMap>>,
    root: PathBuf,
}

impl MediaWatcher {
    /// Start watching `root`. Every debounced batch with at least one change invalidates
    /// the catalog once and is forwarded on the returned channel.
    pub fn start(
        root: &Path,
        invalidator: CatalogInvalidator,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileSystemEvent>), WatcherError> {
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root.to_path_buf()));
        }

        let (event_sender, event_receiver) = mpsc::channel(1000);

        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let changes = invalidator.apply_batch(events.iter().map(|e| &e.event));
                    for change in changes {
                        if let Err(e) = event_sender.try_send(change) {
                            debug!("Dropped file system event: {}", e);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("File watcher error: {:?}", error);
                    }
                }
            }
        })?;

        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
        info!(
            "Watching {} for changes with {}ms debounce",
            root.display(),
            debounce.as_millis()
        );

        Ok((
            MediaWatcher {
                debouncer: Some(debouncer),
                root: root.to_path_buf(),
            },
            event_receiver,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_watching(&self) -> bool {
        self.debouncer.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(debouncer) = self.debouncer.take() {
            debouncer.stop();
            info!("Stopped watching {}", self.root.display());
        }
    }
}
