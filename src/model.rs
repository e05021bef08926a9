//! In-memory representation of DIDL-Lite items and containers.

use crate::dlna::ProtocolInfo;

pub const CONTAINER_CLASS: &str = "object.container";
pub const STORAGE_FOLDER_CLASS: &str = "object.container.storageFolder";

/// A credited person and the optional role attribute (`AlbumArtist`, `Performer`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRole {
    pub name: String,
    pub role: Option<String>,
}

/// Ordered list of people credited in one capacity.
///
/// An entry with an empty name stands for "unknown" and is only kept while
/// it is the sole entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRoles(Vec<PersonRole>);

impl PersonRoles {
    pub fn add(&mut self, name: &str, role: Option<&str>) {
        let role = role.filter(|r| !r.is_empty()).map(|r| r.to_string());

        if name.is_empty() {
            if self.0.is_empty() {
                self.0.push(PersonRole {
                    name: String::new(),
                    role,
                });
            }
            return;
        }

        self.0.retain(|p| !p.name.is_empty());
        if self.0.iter().any(|p| p.name == name && p.role == role) {
            return;
        }
        self.0.push(PersonRole {
            name: name.to_string(),
            role,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonRole> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First credited name, if any.
    pub fn first_name(&self) -> Option<&str> {
        self.0.first().map(|p| p.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleInfo {
    pub artists: PersonRoles,
    pub actors: PersonRoles,
    pub authors: PersonRoles,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffiliationInfo {
    pub album: String,
    /// Rendered in insertion order.
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionInfo {
    pub description: String,
    pub long_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraInfo {
    pub album_art_uri: Option<String>,
    /// `dlna:profileID` attribute of the album art, e.g. `JPEG_TN`.
    pub album_art_profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiscInfo {
    /// 0 means absent.
    pub original_track_number: u32,
    pub toc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedInfo {
    pub program_title: String,
    pub series_title: String,
    /// 0 means absent.
    pub episode_number: u32,
}

/// A transport location for an object's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub uri: String,
    pub protocol_info: ProtocolInfo,
    pub size: Option<u64>,
    /// Seconds.
    pub duration: Option<u32>,
    pub protection: Option<String>,
    /// `WIDTHxHEIGHT`.
    pub resolution: Option<String>,
    pub bitrate: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub sample_frequency: Option<u32>,
    pub nr_audio_channels: Option<u32>,
}

impl Resource {
    pub fn new(uri: impl Into<String>, protocol_info: ProtocolInfo) -> Self {
        Resource {
            uri: uri.into(),
            protocol_info,
            size: None,
            duration: None,
            protection: None,
            resolution: None,
            bitrate: None,
            bits_per_sample: None,
            sample_frequency: None,
            nr_audio_channels: None,
        }
    }
}

/// Fields shared by items and containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBase {
    pub object_id: String,
    pub parent_id: String,
    pub reference_id: Option<String>,
    pub title: String,
    pub creator: String,
    pub date: String,
    pub object_class: String,
    pub restricted: bool,
    pub people: PeopleInfo,
    pub affiliation: AffiliationInfo,
    pub description: DescriptionInfo,
    pub extra_info: ExtraInfo,
    pub misc_info: MiscInfo,
    pub recorded: RecordedInfo,
    pub resources: Vec<Resource>,
}

impl Default for ObjectBase {
    fn default() -> Self {
        ObjectBase {
            object_id: String::new(),
            parent_id: String::new(),
            reference_id: None,
            title: String::new(),
            creator: String::new(),
            date: String::new(),
            object_class: String::new(),
            restricted: true,
            people: PeopleInfo::default(),
            affiliation: AffiliationInfo::default(),
            description: DescriptionInfo::default(),
            extra_info: ExtraInfo::default(),
            misc_info: MiscInfo::default(),
            recorded: RecordedInfo::default(),
            resources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaItem {
    pub base: ObjectBase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaContainer {
    pub base: ObjectBase,
    pub searchable: bool,
    /// `None` when the number of children is unknown.
    pub children_count: Option<u32>,
}

impl Default for MediaContainer {
    fn default() -> Self {
        MediaContainer {
            base: ObjectBase::default(),
            searchable: true,
            children_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaObject {
    Item(MediaItem),
    Container(MediaContainer),
}

impl MediaObject {
    pub fn item(base: ObjectBase) -> Self {
        MediaObject::Item(MediaItem { base })
    }

    pub fn container(base: ObjectBase) -> Self {
        MediaObject::Container(MediaContainer {
            base,
            ..MediaContainer::default()
        })
    }

    pub fn base(&self) -> &ObjectBase {
        match self {
            MediaObject::Item(item) => &item.base,
            MediaObject::Container(container) => &container.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ObjectBase {
        match self {
            MediaObject::Item(item) => &mut item.base,
            MediaObject::Container(container) => &mut container.base,
        }
    }

    pub fn is_container(&self) -> bool {
        self.base().object_class.starts_with(CONTAINER_CLASS)
    }

    /// Clear every field back to its default, keeping the variant.
    pub fn reset(&mut self) {
        match self {
            MediaObject::Item(item) => *item = MediaItem::default(),
            MediaObject::Container(container) => *container = MediaContainer::default(),
        }
    }

    pub fn as_container(&self) -> Option<&MediaContainer> {
        match self {
            MediaObject::Container(container) => Some(container),
            MediaObject::Item(_) => None,
        }
    }
}
