//! DLNA protocol helpers: protocolInfo parsing, MIME classification and
//! per-client overrides.

pub mod client;
pub mod mime;
pub mod protocol_info;

pub use client::{ClientContext, ClientProfile, ClientQuirks};
pub use mime::{
    dlna_extension_for_mime, mime_type_for_path, protocol_info_for_path, upnp_class_for_path,
};
pub use protocol_info::{DlnaParams, ProtocolInfo};
