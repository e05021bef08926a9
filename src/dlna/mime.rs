use super::client::{client_override, ClientContext};
use super::protocol_info::ProtocolInfo;
use std::path::Path;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extension to MIME type, used when no client override applies.
pub static DEFAULT_MIME_TYPES: &[(&str, &str)] = &[
    // Video formats
    ("mp4", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("divx", "video/x-msvideo"),
    ("xvid", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("wmv", "video/x-ms-wmv"),
    ("asf", "video/x-ms-asf"),
    ("flv", "video/x-flv"),
    ("webm", "video/webm"),
    ("m4v", "video/x-m4v"),
    ("3gp", "video/3gpp"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("vob", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
    ("mts", "video/mp2t"),
    // Audio formats
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("wav", "audio/x-wav"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
    ("wma", "audio/x-ms-wma"),
    ("m4a", "audio/mp4"),
    ("opus", "audio/opus"),
    ("aiff", "audio/aiff"),
    ("aif", "audio/aiff"),
    // Image formats
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
    ("webp", "image/webp"),
];

/// MIME type to the default DLNA fourth field.
pub static DEFAULT_DLNA_EXTRAS: &[(&str, &str)] = &[
    ("audio/mpeg", "DLNA.ORG_PN=MP3;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("audio/x-ms-wma", "DLNA.ORG_PN=WMABASE;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("audio/mp4", "DLNA.ORG_PN=AAC_ISO_320;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("audio/aac", "DLNA.ORG_PN=AAC_ADTS_320;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("audio/x-wav", "DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("audio/flac", "DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("image/jpeg", "DLNA.ORG_PN=JPEG_LRG;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("image/png", "DLNA.ORG_PN=PNG_LRG;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("image/gif", "DLNA.ORG_PN=GIF_LRG;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/mpeg", "DLNA.ORG_PN=MPEG_PS_PAL;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/mp4", "DLNA.ORG_PN=AVC_MP4_MP_SD_AAC_MULT5;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/mp2t", "DLNA.ORG_PN=MPEG_TS_SD_EU_ISO;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/x-ms-wmv", "DLNA.ORG_PN=WMVMED_FULL;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/x-ms-asf", "DLNA.ORG_PN=MPEG4_P2_ASF_SP_G726;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/x-matroska", "DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
    ("video/x-msvideo", "DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Get MIME type for a file based on its extension, honoring client overrides.
pub fn mime_type_for_path(path: &Path, client: &ClientContext) -> String {
    let extension = extension_of(path);

    if let Some(mime) = client_override(client).and_then(|o| o.mime_for_extension(&extension)) {
        return mime.to_string();
    }

    DEFAULT_MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Default DLNA fourth field for a MIME type; `*` when nothing is known.
pub fn dlna_extension_for_mime(mime: &str, client: &ClientContext) -> String {
    if let Some(extra) = client_override(client).and_then(|o| o.dlna_for_mime(mime)) {
        return extra.to_string();
    }

    DEFAULT_DLNA_EXTRAS
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, extra)| *extra)
        .unwrap_or("*")
        .to_string()
}

/// Get the appropriate UPnP class for a file.
pub fn upnp_class_for_path(path: &Path) -> &'static str {
    upnp_class_for_mime(&mime_type_for_path(path, &ClientContext::generic()))
}

pub fn upnp_class_for_mime(mime: &str) -> &'static str {
    if mime.starts_with("audio/") {
        "object.item.audioItem.musicTrack"
    } else if mime.starts_with("video/") {
        "object.item.videoItem"
    } else if mime.starts_with("image/") {
        "object.item.imageItem.photo"
    } else {
        "object.item"
    }
}

/// `http-get` protocolInfo describing how a file is served to this client.
pub fn protocol_info_for_path(path: &Path, client: &ClientContext) -> ProtocolInfo {
    let mime = mime_type_for_path(path, client);
    let extra = dlna_extension_for_mime(&mime, client);
    ProtocolInfo::new("http-get", "*", &mime, &extra)
}

/// The source protocol list advertised by ConnectionManager.
pub fn source_protocol_info() -> String {
    let mut seen: Vec<&str> = Vec::new();
    let mut entries = Vec::new();
    for (_, mime) in DEFAULT_MIME_TYPES {
        if seen.contains(mime) {
            continue;
        }
        seen.push(*mime);
        let extra = dlna_extension_for_mime(mime, &ClientContext::generic());
        entries.push(format!("http-get:*:{}:{}", mime, extra));
    }
    entries.join(",")
}
