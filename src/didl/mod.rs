//! DIDL-Lite serialization of media objects.

pub mod escape;
pub mod filter;
pub mod reader;

pub use escape::{format_timestamp, parse_timestamp, xml_escape, xml_unescape};
pub use filter::FilterMask;
pub use reader::{from_didl, DidlError};

use crate::model::{MediaObject, ObjectBase, PersonRoles, Resource};
use escape::append_xml_escape;
use std::fmt::Write;
use tracing::debug;

pub const DIDL_HEADER: &str = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:dlna="urn:schemas-dlna-org:metadata-1-0/">"#;
pub const DIDL_FOOTER: &str = "</DIDL-Lite>";

/// Wrap serialized objects in a DIDL-Lite document.
pub fn wrap_didl(body: &str) -> String {
    let mut out = String::with_capacity(DIDL_HEADER.len() + body.len() + DIDL_FOOTER.len());
    out.push_str(DIDL_HEADER);
    out.push_str(body);
    out.push_str(DIDL_FOOTER);
    out
}

/// Serialize a single object as an `<item>` or `<container>` element.
pub fn to_didl(object: &MediaObject, mask: FilterMask) -> String {
    let mut out = String::new();
    write_object(&mut out, object, mask);
    out
}

/// Serialize `object` into `out`. Optional fields are gated by `mask`; the
/// id, parentID, restricted, title and class are always written.
pub fn write_object(out: &mut String, object: &MediaObject, mask: FilterMask) {
    let base = object.base();
    let tag = match object {
        MediaObject::Item(_) => "item",
        MediaObject::Container(_) => "container",
    };

    out.push('<');
    out.push_str(tag);
    write_attr(out, "id", &base.object_id);
    write_attr(out, "parentID", &base.parent_id);
    if let Some(ref_id) = &base.reference_id {
        write_attr(out, "refID", ref_id);
    }
    write_attr(out, "restricted", if base.restricted { "1" } else { "0" });

    if let MediaObject::Container(container) = object {
        if mask.contains(FilterMask::SEARCHABLE) {
            write_attr(out, "searchable", if container.searchable { "1" } else { "0" });
        }
        if mask.contains(FilterMask::CHILDCOUNT) {
            if let Some(count) = container.children_count {
                write_attr(out, "childCount", &count.to_string());
            }
        }
    }
    out.push('>');

    write_fields(out, base, mask);

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_fields(out: &mut String, base: &ObjectBase, mask: FilterMask) {
    write_element(out, "dc:title", &base.title);

    if mask.contains(FilterMask::CREATOR) && !base.creator.is_empty() {
        write_element(out, "dc:creator", &base.creator);
    }
    if mask.contains(FilterMask::DATE) && !base.date.is_empty() {
        write_element(out, "dc:date", &base.date);
    }
    if mask.contains(FilterMask::ARTIST) {
        write_people(out, "upnp:artist", &base.people.artists);
    }
    if mask.contains(FilterMask::ACTOR) {
        write_people(out, "upnp:actor", &base.people.actors);
    }
    if mask.contains(FilterMask::AUTHOR) {
        write_people(out, "upnp:author", &base.people.authors);
    }
    if mask.contains(FilterMask::ALBUM) && !base.affiliation.album.is_empty() {
        write_element(out, "upnp:album", &base.affiliation.album);
    }
    if mask.contains(FilterMask::GENRE) {
        for genre in &base.affiliation.genres {
            write_element(out, "upnp:genre", genre);
        }
    }
    if mask.contains(FilterMask::ALBUMARTURI) {
        if let Some(uri) = &base.extra_info.album_art_uri {
            out.push_str("<upnp:albumArtURI");
            if let Some(profile) = &base.extra_info.album_art_profile {
                write_attr(out, "dlna:profileID", profile);
            }
            out.push('>');
            append_xml_escape(out, uri);
            out.push_str("</upnp:albumArtURI>");
        }
    }
    if mask.contains(FilterMask::DESCRIPTION) && !base.description.description.is_empty() {
        write_element(out, "dc:description", &base.description.description);
    }
    if mask.contains(FilterMask::LONGDESCRIPTION) && !base.description.long_description.is_empty()
    {
        write_element(
            out,
            "upnp:longDescription",
            &base.description.long_description,
        );
    }
    if mask.contains(FilterMask::ORIGINALTRACK) && base.misc_info.original_track_number > 0 {
        write_element(
            out,
            "upnp:originalTrackNumber",
            &base.misc_info.original_track_number.to_string(),
        );
    }
    if mask.contains(FilterMask::PROGRAMTITLE) && !base.recorded.program_title.is_empty() {
        write_element(out, "upnp:programTitle", &base.recorded.program_title);
    }
    if mask.contains(FilterMask::SERIESTITLE) && !base.recorded.series_title.is_empty() {
        write_element(out, "upnp:seriesTitle", &base.recorded.series_title);
    }
    if mask.contains(FilterMask::EPISODE) && base.recorded.episode_number > 0 {
        write_element(
            out,
            "upnp:episodeNumber",
            &base.recorded.episode_number.to_string(),
        );
    }
    if mask.contains(FilterMask::TOC) && !base.misc_info.toc.is_empty() {
        write_element(out, "upnp:toc", &base.misc_info.toc);
    }
    if mask.contains(FilterMask::RES) {
        for resource in &base.resources {
            write_resource(out, resource, mask);
        }
    }

    write_element(out, "upnp:class", &base.object_class);
}

fn write_people(out: &mut String, element: &str, people: &PersonRoles) {
    for person in people.iter() {
        out.push('<');
        out.push_str(element);
        if let Some(role) = &person.role {
            write_attr(out, "role", role);
        }
        out.push('>');
        append_xml_escape(out, &person.name);
        out.push_str("</");
        out.push_str(element);
        out.push('>');
    }
}

fn write_resource(out: &mut String, resource: &Resource, mask: FilterMask) {
    if !resource.protocol_info.is_valid() {
        debug!("Dropping resource {} with invalid protocolInfo", resource.uri);
        return;
    }

    out.push_str("<res");
    write_attr(out, "protocolInfo", &resource.protocol_info.to_string());
    if mask.contains(FilterMask::RES_DURATION) {
        if let Some(duration) = resource.duration {
            write_attr(out, "duration", &format_timestamp(duration));
        }
    }
    if mask.contains(FilterMask::RES_SIZE) {
        if let Some(size) = resource.size {
            write_attr(out, "size", &size.to_string());
        }
    }
    if mask.contains(FilterMask::RES_PROTECTION) {
        if let Some(protection) = &resource.protection {
            write_attr(out, "protection", protection);
        }
    }
    if mask.contains(FilterMask::RES_RESOLUTION) {
        if let Some(resolution) = &resource.resolution {
            write_attr(out, "resolution", resolution);
        }
    }
    let numeric = [
        (FilterMask::RES_BITRATE, "bitrate", resource.bitrate),
        (FilterMask::RES_BITSPERSAMPLE, "bitsPerSample", resource.bits_per_sample),
        (FilterMask::RES_SAMPLEFREQUENCY, "sampleFrequency", resource.sample_frequency),
        (FilterMask::RES_NRAUDIOCHANNELS, "nrAudioChannels", resource.nr_audio_channels),
    ];
    for (bit, name, value) in numeric {
        if let (true, Some(value)) = (mask.contains(bit), value) {
            write_attr(out, name, &value.to_string());
        }
    }
    out.push('>');
    append_xml_escape(out, &resource.uri);
    out.push_str("</res>");
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {}=\"", name);
    append_xml_escape(out, value);
    out.push('"');
}

fn write_element(out: &mut String, name: &str, text: &str) {
    let _ = write!(out, "<{}>", name);
    append_xml_escape(out, text);
    let _ = write!(out, "</{}>", name);
}
