//! Pluggable per-format metadata extraction.

pub mod audio;

pub use audio::AudioTagHandler;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("unsupported file: {0}")]
    Unsupported(String),

    #[error("failed to read tags: {0}")]
    Tags(#[from] lofty::error::LoftyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Embedded cover art.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime: Option<String>,
}

impl CoverArt {
    /// DLNA thumbnail profile for the albumArtURI.
    pub fn dlna_profile(&self) -> &'static str {
        match self.mime.as_deref() {
            Some("image/png") => "PNG_TN",
            _ => "JPEG_TN",
        }
    }
}

/// What a handler learned about one file. Only valid after a successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Seconds.
    pub duration: Option<u32>,
    pub protection: Option<String>,
    pub cover_art: Option<CoverArt>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    /// Raw genre tag; multiple genres are separated by `" / "`.
    pub genre: Option<String>,
    pub track: Option<u32>,
    pub year: Option<u32>,
    /// Bytes per second, as DIDL-Lite expects.
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub bits_per_sample: Option<u32>,
}

pub trait MetadataHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this handler claims files with the given lowercase extension.
    fn handles_extension(&self, ext: &str) -> bool;

    /// Read the file. On error the caller falls back to filename-derived data.
    fn load(&self, path: &Path) -> Result<MediaMetadata, MetadataError>;
}

/// Ordered list of handlers; the first one claiming an extension wins.
#[derive(Default)]
pub struct MetadataHandlerRegistry {
    handlers: Vec<Arc<dyn MetadataHandler>>,
}

impl MetadataHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AudioTagHandler));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn MetadataHandler>) {
        debug!("Registered metadata handler '{}'", handler.name());
        self.handlers.push(handler);
    }

    pub fn find_for(&self, path: &Path) -> Option<Arc<dyn MetadataHandler>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.handlers
            .iter()
            .find(|h| h.handles_extension(&ext))
            .cloned()
    }

    /// Find a handler and load the file, logging and swallowing failures.
    pub fn load(&self, path: &Path) -> Option<MediaMetadata> {
        let handler = self.find_for(path)?;
        match handler.load(path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!(
                    "Handler '{}' failed on {}: {}",
                    handler.name(),
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for MetadataHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, &'static str);

    impl MetadataHandler for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn handles_extension(&self, ext: &str) -> bool {
            ext == self.1
        }

        fn load(&self, _path: &Path) -> Result<MediaMetadata, MetadataError> {
            Ok(MediaMetadata {
                title: Some(self.0.to_string()),
                ..MediaMetadata::default()
            })
        }
    }

    struct Failing;

    impl MetadataHandler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn handles_extension(&self, _ext: &str) -> bool {
            true
        }

        fn load(&self, path: &Path) -> Result<MediaMetadata, MetadataError> {
            Err(MetadataError::Unsupported(path.display().to_string()))
        }
    }

    #[test]
    fn test_first_registered_wins() {
        let mut registry = MetadataHandlerRegistry::new();
        registry.register(Arc::new(Fixed("first", "ogg")));
        registry.register(Arc::new(Fixed("second", "ogg")));
        registry.register(Arc::new(Fixed("third", "mkv")));

        assert_eq!(registry.find_for(Path::new("x.OGG")).map(|h| h.name()), Some("first"));
        assert_eq!(registry.find_for(Path::new("x.mkv")).map(|h| h.name()), Some("third"));
        assert!(registry.find_for(Path::new("x.txt")).is_none());
        assert!(registry.find_for(Path::new("noext")).is_none());
    }

    #[test]
    fn test_failed_load_is_swallowed() {
        let mut registry = MetadataHandlerRegistry::new();
        registry.register(Arc::new(Failing));
        assert!(registry.load(Path::new("a.mp3")).is_none());
    }

    #[test]
    fn test_cover_art_profile() {
        let png = CoverArt {
            data: vec![],
            mime: Some("image/png".to_string()),
        };
        let unknown = CoverArt {
            data: vec![],
            mime: None,
        };
        assert_eq!(png.dlna_profile(), "PNG_TN");
        assert_eq!(unknown.dlna_profile(), "JPEG_TN");
    }
}
