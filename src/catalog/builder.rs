use super::object_id::ObjectIdResolver;
use crate::dlna::{mime, ClientContext};
use crate::metadata::{MediaMetadata, MetadataHandlerRegistry};
use crate::model::{
    MediaContainer, MediaObject, ObjectBase, Resource, CONTAINER_CLASS, STORAGE_FOLDER_CLASS,
};
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::debug;

/// Characters left alone when a relative path is put into a `path=` query value.
pub const PATH_QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const CONTENT_PATH: &str = "/content";
pub const ALBUM_ART_PATH: &str = "/albumart";
pub const UNKNOWN_SERIES: &str = "[Unknown Series]";

/// Builds one media object per filesystem entry for a single request.
pub struct ObjectBuilder<'a> {
    pub resolver: &'a ObjectIdResolver,
    pub registry: &'a MetadataHandlerRegistry,
    pub addresses: &'a [IpAddr],
    pub port: u16,
    pub client: &'a ClientContext,
}

/// The filename with its last extension removed. `.mp3` yields an empty title.
pub fn title_from_file_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

impl<'a> ObjectBuilder<'a> {
    /// Build the object for `path`, or `None` when the entry must be left out.
    pub fn build(&self, path: &Path, with_count: bool) -> Option<MediaObject> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };
        let (object_id, parent_id) = self.resolver.to_object_id(path).ok()?;

        let base = ObjectBase {
            object_id,
            parent_id,
            ..ObjectBase::default()
        };

        if metadata.is_dir() {
            self.build_container(path, base, with_count)
        } else if metadata.is_file() {
            self.build_item(path, base, &metadata)
        } else {
            None
        }
    }

    fn build_container(
        &self,
        path: &Path,
        mut base: ObjectBase,
        with_count: bool,
    ) -> Option<MediaObject> {
        let is_root = path == self.resolver.root();
        if is_root {
            base.title = "Root".to_string();
            base.object_class = CONTAINER_CLASS.to_string();
        } else {
            base.title = path.file_name()?.to_str()?.to_string();
            base.object_class = STORAGE_FOLDER_CLASS.to_string();
        }
        if base.title.is_empty() {
            return None;
        }
        if self.client.quirks().only_storage_folder {
            base.object_class = STORAGE_FOLDER_CLASS.to_string();
        }

        let children_count = if with_count {
            Some(self.count_children(path))
        } else {
            None
        };

        Some(MediaObject::Container(MediaContainer {
            base,
            searchable: true,
            children_count,
        }))
    }

    fn build_item(
        &self,
        path: &Path,
        mut base: ObjectBase,
        metadata: &fs::Metadata,
    ) -> Option<MediaObject> {
        let file_name = path.file_name()?.to_str()?;
        base.title = title_from_file_name(file_name).to_string();
        if base.title.is_empty() {
            return None;
        }

        let protocol_info = mime::protocol_info_for_path(path, self.client);
        if !protocol_info.is_valid() {
            debug!("Skipping {}: no usable protocolInfo", path.display());
            return None;
        }
        base.object_class = mime::upnp_class_for_mime(protocol_info.content_type()).to_string();

        let relative = self.resolver.relative_path(path)?;
        let encoded = utf8_percent_encode(&relative, PATH_QUERY_ENCODE_SET).to_string();

        for ip in self.ordered_addresses() {
            let mut resource = Resource::new(
                format!("http://{}{}?path={}", SocketAddr::new(ip, self.port), CONTENT_PATH, encoded),
                protocol_info.clone(),
            );
            resource.size = Some(metadata.len());
            base.resources.push(resource);
        }

        if let Some(tags) = self.registry.load(path) {
            self.apply_metadata(&mut base, tags, &encoded);
        }

        if base.date.is_empty() {
            if let Ok(modified) = metadata.modified() {
                base.date = DateTime::<Utc>::from(modified)
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string();
            }
        }

        let quirks = self.client.quirks();
        if base.object_class.starts_with("object.item.videoItem") {
            if quirks.basic_video_class {
                base.object_class = "object.item.videoItem".to_string();
            }
            if quirks.unknown_series && base.affiliation.album.is_empty() {
                base.affiliation.album = UNKNOWN_SERIES.to_string();
            }
        }

        Some(MediaObject::item(base))
    }

    fn apply_metadata(&self, base: &mut ObjectBase, tags: MediaMetadata, encoded_path: &str) {
        if let Some(title) = tags.title {
            base.title = title;
        }
        if let Some(description) = tags.description {
            base.description.description = description;
        }

        if let Some(artist) = &tags.artist {
            base.people.artists.add(artist, None);
            base.people.artists.add(artist, Some("Performer"));
        }
        if let Some(album_artist) = &tags.album_artist {
            base.people.artists.add(album_artist, Some("AlbumArtist"));
        }
        if let Some(creator) = tags.album_artist.as_ref().or(tags.artist.as_ref()) {
            base.creator = creator.clone();
        }

        if let Some(album) = tags.album {
            base.affiliation.album = album;
        }
        if let Some(genre) = &tags.genre {
            base.affiliation.genres = genre
                .split(" / ")
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(track) = tags.track {
            base.misc_info.original_track_number = track;
        }
        if let Some(year) = tags.year {
            base.date = format!("{:04}-01-01", year);
        }

        for resource in &mut base.resources {
            resource.duration = tags.duration;
            resource.protection = tags.protection.clone();
            resource.bitrate = tags.bitrate;
            resource.sample_frequency = tags.sample_rate;
            resource.nr_audio_channels = tags.channels;
            resource.bits_per_sample = tags.bits_per_sample;
        }

        if let Some(cover) = &tags.cover_art {
            if let Some(ip) = self.ordered_addresses().first() {
                base.extra_info.album_art_uri = Some(format!(
                    "http://{}{}?path={}",
                    SocketAddr::new(*ip, self.port),
                    ALBUM_ART_PATH,
                    encoded_path
                ));
                base.extra_info.album_art_profile = Some(cover.dlna_profile().to_string());
            }
        }
    }

    /// Whether `build` would produce an object for `path`, without reading tags.
    pub fn admits(&self, path: &Path) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        if self.resolver.to_object_id(path).is_err() {
            return false;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if metadata.is_dir() {
            !name.is_empty()
        } else if metadata.is_file() {
            !title_from_file_name(name).is_empty()
                && self.resolver.relative_path(path).is_some()
                && mime::protocol_info_for_path(path, self.client).is_valid()
        } else {
            false
        }
    }

    /// Number of directory entries that would be listed as children.
    pub fn count_children(&self, path: &Path) -> u32 {
        match fs::read_dir(path) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|entry| self.admits(&entry.path()))
                .count() as u32,
            Err(e) => {
                debug!("Cannot count children of {}: {}", path.display(), e);
                0
            }
        }
    }

    /// Configured addresses with the one the request arrived on moved to the front.
    pub fn ordered_addresses(&self) -> Vec<IpAddr> {
        let mut addresses = self.addresses.to_vec();
        if let Some(local) = self.client.local_addr {
            if let Some(pos) = addresses.iter().position(|ip| *ip == local) {
                let preferred = addresses.remove(pos);
                addresses.insert(0, preferred);
            }
        }
        addresses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlna::ClientContext;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        resolver: ObjectIdResolver,
        registry: MetadataHandlerRegistry,
        addresses: Vec<IpAddr>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Sub")).unwrap();
        fs::write(dir.path().join("Sub/x.jpg"), b"jpg").unwrap();
        fs::write(dir.path().join("b.txt"), b"hello").unwrap();
        fs::write(dir.path().join(".mp3"), b"").unwrap();
        fs::write(dir.path().join("clip.avi"), b"avi").unwrap();
        Fixture {
            resolver: ObjectIdResolver::new(dir.path()).unwrap(),
            registry: MetadataHandlerRegistry::with_defaults(),
            addresses: vec!["10.0.0.1".parse().unwrap(), "192.168.1.5".parse().unwrap()],
            _dir: dir,
        }
    }

    fn builder<'a>(f: &'a Fixture, client: &'a ClientContext) -> ObjectBuilder<'a> {
        ObjectBuilder {
            resolver: &f.resolver,
            registry: &f.registry,
            addresses: &f.addresses,
            port: 8200,
            client,
        }
    }

    #[test]
    fn test_title_from_file_name() {
        assert_eq!(title_from_file_name("a.mp3"), "a");
        assert_eq!(title_from_file_name("a.b.mp3"), "a.b");
        assert_eq!(title_from_file_name(".mp3"), "");
        assert_eq!(title_from_file_name("README"), "README");
    }

    #[test]
    fn test_build_root_and_folder() {
        let f = fixture();
        let client = ClientContext::generic();
        let b = builder(&f, &client);

        let root = b.build(f.resolver.root(), true).unwrap();
        assert_eq!(root.base().title, "Root");
        assert_eq!(root.base().object_class, CONTAINER_CLASS);
        assert_eq!(root.base().parent_id, "-1");
        assert_eq!(root.as_container().unwrap().children_count, Some(3));

        let sub = b.build(&f.resolver.root().join("Sub"), false).unwrap();
        assert_eq!(sub.base().object_id, "0/Sub");
        assert_eq!(sub.base().object_class, STORAGE_FOLDER_CLASS);
        assert_eq!(sub.as_container().unwrap().children_count, None);
    }

    #[test]
    fn test_build_plain_file() {
        let f = fixture();
        let client = ClientContext::generic();
        let item = builder(&f, &client)
            .build(&f.resolver.root().join("b.txt"), false)
            .unwrap();
        let base = item.base();
        assert_eq!(base.title, "b");
        assert_eq!(base.object_class, "object.item");
        assert_eq!(base.resources.len(), 2);
        assert_eq!(base.resources[0].uri, "http://10.0.0.1:8200/content?path=b.txt");
        assert_eq!(base.resources[0].size, Some(5));
        assert_eq!(base.resources[0].protocol_info.content_type(), "application/octet-stream");
        assert!(!base.date.is_empty());
    }

    #[test]
    fn test_empty_title_is_excluded() {
        let f = fixture();
        let client = ClientContext::generic();
        assert!(builder(&f, &client).build(&f.resolver.root().join(".mp3"), false).is_none());
    }

    #[test]
    fn test_request_address_comes_first() {
        let f = fixture();
        let client = ClientContext {
            local_addr: Some("192.168.1.5".parse().unwrap()),
            ..ClientContext::default()
        };
        let item = builder(&f, &client)
            .build(&f.resolver.root().join("Sub/x.jpg"), false)
            .unwrap();
        assert_eq!(
            item.base().resources[0].uri,
            "http://192.168.1.5:8200/content?path=Sub%2Fx.jpg"
        );
        assert_eq!(item.base().object_class, "object.item.imageItem.photo");
    }

    #[test]
    fn test_client_quirks() {
        let f = fixture();
        let xbox = ClientContext::with_user_agent("Xbox/2.0.4548.0");
        let root = builder(&f, &xbox).build(f.resolver.root(), false).unwrap();
        assert_eq!(root.base().object_class, STORAGE_FOLDER_CLASS);

        let clip = builder(&f, &xbox)
            .build(&f.resolver.root().join("clip.avi"), false)
            .unwrap();
        assert_eq!(clip.base().resources[0].protocol_info.content_type(), "video/avi");

        let wmp = ClientContext::with_user_agent("Windows-Media-Player/12.0");
        let clip = builder(&f, &wmp)
            .build(&f.resolver.root().join("clip.avi"), false)
            .unwrap();
        assert_eq!(clip.base().affiliation.album, UNKNOWN_SERIES);
    }

    #[cfg(unix)]
    #[test]
    fn test_child_count_matches_listing() {
        let f = fixture();
        let root = f.resolver.root().to_path_buf();
        std::os::unix::fs::symlink(root.join("missing.txt"), root.join("dangling.txt")).unwrap();
        let fifo = std::ffi::CString::new(root.join("pipe.txt").to_str().unwrap()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(fifo.as_ptr(), 0o644) }, 0);

        let client = ClientContext::generic();
        let b = builder(&f, &client);
        let listed = fs::read_dir(&root)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| b.build(&entry.path(), false).is_some())
            .count() as u32;

        assert_eq!(listed, 3);
        assert_eq!(b.count_children(&root), listed);
        assert!(!b.admits(&root.join("dangling.txt")));
        assert!(!b.admits(&root.join("pipe.txt")));
    }
}
