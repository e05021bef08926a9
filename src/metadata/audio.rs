use super::{CoverArt, MediaMetadata, MetadataError, MetadataHandler};
use lofty::{config::ParseOptions, prelude::*, probe::Probe, tag::ItemKey};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

const EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "opus", "m4a", "aac", "wav", "aiff", "aif", "wma", "ape", "wv", "mpc",
];

/// Reads audio tags and stream properties with lofty.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioTagHandler;

impl MetadataHandler for AudioTagHandler {
    fn name(&self) -> &'static str {
        "audio-tags"
    }

    fn handles_extension(&self, ext: &str) -> bool {
        EXTENSIONS.contains(&ext)
    }

    fn load(&self, path: &Path) -> Result<MediaMetadata, MetadataError> {
        let tagged_file = Probe::open(path)?.options(ParseOptions::new()).read()?;
        let properties = tagged_file.properties();

        let duration = properties.duration().as_secs() as u32;
        let mut metadata = MediaMetadata {
            duration: (duration > 0).then_some(duration),
            bitrate: properties.audio_bitrate().map(|kbps| kbps * 1000 / 8),
            sample_rate: properties.sample_rate(),
            channels: properties.channels().map(u32::from),
            bits_per_sample: properties.bit_depth().map(u32::from),
            ..MediaMetadata::default()
        };

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());

        match tag {
            Some(tag) => {
                metadata.title = tag_text(tag.title());
                metadata.artist = tag_text(tag.artist());
                metadata.album = tag_text(tag.album());
                metadata.genre = tag_text(tag.genre());
                metadata.description = tag_text(tag.comment());
                metadata.album_artist =
                    tag_text(tag.get_string(&ItemKey::AlbumArtist).map(Cow::Borrowed));
                metadata.track = tag.track().filter(|t| *t > 0);
                metadata.year = tag.year().filter(|y| *y > 0);
                metadata.cover_art = tag.pictures().first().map(|picture| CoverArt {
                    data: picture.data().to_vec(),
                    mime: picture.mime_type().map(|m| m.as_str().to_string()),
                });
            }
            None => debug!("No tags found in {}", path.display()),
        }

        Ok(metadata)
    }
}

fn tag_text(value: Option<Cow<'_, str>>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
