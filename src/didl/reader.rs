use super::escape::parse_timestamp;
use crate::dlna::ProtocolInfo;
use crate::model::{MediaContainer, MediaItem, MediaObject, ObjectBase, Resource};
use thiserror::Error;
use tracing::warn;
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::reader::{EventReader, XmlEvent};

#[derive(Error, Debug)]
pub enum DidlError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xml::reader::Error),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("object '{0}' has no upnp:class")]
    MissingClass(String),
}

/// Parse the `<item>` and `<container>` children of a DIDL-Lite document.
pub fn from_didl(xml: &str) -> Result<Vec<MediaObject>, DidlError> {
    let parser = EventReader::new(xml.as_bytes());
    let mut objects = Vec::new();
    let mut current: Option<MediaObject> = None;
    let mut element: Option<(String, Vec<OwnedAttribute>)> = None;
    let mut text = String::new();

    for event in parser {
        match event? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let qualified = qualified_name(&name);
                if current.is_none() {
                    match qualified.as_str() {
                        "item" => current = Some(start_item(&attributes)?),
                        "container" => current = Some(start_container(&attributes)?),
                        _ => {}
                    }
                } else {
                    element = Some((qualified, attributes));
                    text.clear();
                }
            }
            XmlEvent::Characters(chars) | XmlEvent::CData(chars) => {
                if element.is_some() {
                    text.push_str(&chars);
                }
            }
            XmlEvent::EndElement { name } => {
                let qualified = qualified_name(&name);
                if qualified == "item" || qualified == "container" {
                    if let Some(object) = current.take() {
                        if object.base().object_class.is_empty() {
                            return Err(DidlError::MissingClass(object.base().object_id.clone()));
                        }
                        objects.push(object);
                    }
                } else if let (Some(object), Some((open, attributes))) =
                    (current.as_mut(), element.take())
                {
                    if open == qualified {
                        apply_element(object.base_mut(), &open, &attributes, text.trim());
                    }
                }
                text.clear();
            }
            _ => {}
        }
    }

    Ok(objects)
}

fn qualified_name(name: &OwnedName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local_name),
        None => name.local_name.clone(),
    }
}

fn attr<'a>(attributes: &'a [OwnedAttribute], qualified: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| qualified_name(&a.name) == qualified)
        .map(|a| a.value.as_str())
}

fn is_true(value: Option<&str>) -> Option<bool> {
    value.map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn start_base(
    element: &'static str,
    attributes: &[OwnedAttribute],
) -> Result<ObjectBase, DidlError> {
    let object_id = attr(attributes, "id").ok_or(DidlError::MissingAttribute {
        element,
        attribute: "id",
    })?;
    let parent_id = attr(attributes, "parentID").ok_or(DidlError::MissingAttribute {
        element,
        attribute: "parentID",
    })?;

    Ok(ObjectBase {
        object_id: object_id.to_string(),
        parent_id: parent_id.to_string(),
        reference_id: attr(attributes, "refID").map(|s| s.to_string()),
        restricted: is_true(attr(attributes, "restricted")).unwrap_or(true),
        ..ObjectBase::default()
    })
}

fn start_item(attributes: &[OwnedAttribute]) -> Result<MediaObject, DidlError> {
    Ok(MediaObject::Item(MediaItem {
        base: start_base("item", attributes)?,
    }))
}

fn start_container(attributes: &[OwnedAttribute]) -> Result<MediaObject, DidlError> {
    Ok(MediaObject::Container(MediaContainer {
        base: start_base("container", attributes)?,
        searchable: is_true(attr(attributes, "searchable")).unwrap_or(true),
        children_count: attr(attributes, "childCount").and_then(|c| c.parse().ok()),
    }))
}

fn apply_element(base: &mut ObjectBase, name: &str, attributes: &[OwnedAttribute], text: &str) {
    match name {
        "dc:title" => base.title = text.to_string(),
        "dc:creator" => base.creator = text.to_string(),
        "dc:date" => base.date = text.to_string(),
        "upnp:artist" => base.people.artists.add(text, attr(attributes, "role")),
        "upnp:actor" => base.people.actors.add(text, attr(attributes, "role")),
        "upnp:author" => base.people.authors.add(text, attr(attributes, "role")),
        "upnp:album" => base.affiliation.album = text.to_string(),
        "upnp:genre" => base.affiliation.genres.push(text.to_string()),
        "upnp:albumArtURI" => {
            base.extra_info.album_art_uri = Some(text.to_string());
            base.extra_info.album_art_profile =
                attr(attributes, "dlna:profileID").map(|s| s.to_string());
        }
        "dc:description" => base.description.description = text.to_string(),
        "upnp:longDescription" => base.description.long_description = text.to_string(),
        "upnp:originalTrackNumber" => {
            base.misc_info.original_track_number = text.parse().unwrap_or(0)
        }
        "upnp:programTitle" => base.recorded.program_title = text.to_string(),
        "upnp:seriesTitle" => base.recorded.series_title = text.to_string(),
        "upnp:episodeNumber" => base.recorded.episode_number = text.parse().unwrap_or(0),
        "upnp:toc" => base.misc_info.toc = text.to_string(),
        "upnp:class" => base.object_class = text.to_string(),
        "res" => {
            if let Some(resource) = parse_resource(attributes, text) {
                base.resources.push(resource);
            }
        }
        _ => {}
    }
}

fn parse_resource(attributes: &[OwnedAttribute], uri: &str) -> Option<Resource> {
    if uri.is_empty() || !uri.contains("://") {
        warn!("Skipping resource with unusable URI '{}'", uri);
        return None;
    }

    let protocol_info = match attr(attributes, "protocolInfo") {
        Some(text) => ProtocolInfo::parse(text),
        None => {
            warn!("Skipping resource {} without protocolInfo", uri);
            return None;
        }
    };
    if !protocol_info.is_valid() {
        warn!("Skipping resource {} with invalid protocolInfo", uri);
        return None;
    }

    let number = |name: &str| attr(attributes, name).and_then(|v| v.parse::<u32>().ok());

    let mut resource = Resource::new(uri, protocol_info);
    resource.size = attr(attributes, "size").and_then(|v| v.parse().ok());
    resource.duration = attr(attributes, "duration").and_then(parse_timestamp);
    resource.protection = attr(attributes, "protection").map(|s| s.to_string());
    resource.resolution = attr(attributes, "resolution").map(|s| s.to_string());
    resource.bitrate = number("bitrate");
    resource.bits_per_sample = number("bitsPerSample");
    resource.sample_frequency = number("sampleFrequency");
    resource.nr_audio_channels = number("nrAudioChannels");
    Some(resource)
}
