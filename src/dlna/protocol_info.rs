use std::fmt;
use tracing::{debug, warn};

/// Ordering stages of the DLNA fourth field. A field may only follow fields of
/// the same or an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Pn,
    Op,
    Ps,
    Ci,
    Flags,
    MaxSp,
    Other,
}

impl Stage {
    fn for_key(key: &str) -> Stage {
        match key {
            "DLNA.ORG_PN" => Stage::Pn,
            "DLNA.ORG_OP" => Stage::Op,
            "DLNA.ORG_PS" => Stage::Ps,
            "DLNA.ORG_CI" => Stage::Ci,
            "DLNA.ORG_FLAGS" => Stage::Flags,
            "DLNA.ORG_MAXSP" => Stage::MaxSp,
            _ => Stage::Other,
        }
    }
}

/// The parsed `DLNA.ORG_*` parameters of a protocolInfo string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DlnaParams {
    pub pn: Option<String>,
    pub op: Option<String>,
    pub ps: Option<String>,
    pub ci: Option<String>,
    pub flags: Option<String>,
    pub maxsp: Option<String>,
    /// Vendor fields (`prefix_NAME=VALUE`) in the order they were given.
    pub others: Vec<(String, String)>,
}

impl DlnaParams {
    fn is_empty(&self) -> bool {
        self.pn.is_none()
            && self.op.is_none()
            && self.ps.is_none()
            && self.ci.is_none()
            && self.flags.is_none()
            && self.maxsp.is_none()
            && self.others.is_empty()
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        let first_class = [
            ("DLNA.ORG_PN", &self.pn),
            ("DLNA.ORG_OP", &self.op),
            ("DLNA.ORG_PS", &self.ps),
            ("DLNA.ORG_CI", &self.ci),
            ("DLNA.ORG_FLAGS", &self.flags),
            ("DLNA.ORG_MAXSP", &self.maxsp),
        ];
        for (key, value) in first_class {
            if let Some(value) = value {
                fields.push(format!("{}={}", key, value));
            }
        }
        for (key, value) in &self.others {
            fields.push(format!("{}={}", key, value));
        }
        fields
    }
}

/// A UPnP `protocolInfo` descriptor: `protocol:mask:contentType:extra`.
///
/// Parsing never fails outright; a malformed string produces a value whose
/// [`ProtocolInfo::is_valid`] is false. Callers must check validity before
/// emitting the value in DIDL-Lite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInfo {
    protocol: String,
    mask: String,
    content_type: String,
    extra: String,
    dlna: DlnaParams,
    valid: bool,
}

impl ProtocolInfo {
    /// Parse a protocolInfo string.
    pub fn parse(text: &str) -> Self {
        let parts: Vec<&str> = text.trim().split(':').collect();
        if parts.len() != 4 {
            debug!("protocolInfo '{}' does not have 4 fields", text);
            return Self::invalid(text);
        }
        Self::new(parts[0], parts[1], parts[2], parts[3])
    }

    /// Build a protocolInfo from its four fields, validating the fourth.
    pub fn new(protocol: &str, mask: &str, content_type: &str, extra: &str) -> Self {
        let mut info = ProtocolInfo {
            protocol: protocol.to_string(),
            mask: mask.to_string(),
            content_type: content_type.to_string(),
            extra: extra.to_string(),
            dlna: DlnaParams::default(),
            valid: false,
        };

        if protocol.is_empty() || mask.is_empty() || content_type.is_empty() {
            return info;
        }

        match parse_extra(extra) {
            Some(dlna) => {
                info.dlna = dlna;
                info.valid = true;
            }
            None => debug!("protocolInfo extra '{}' rejected", extra),
        }
        info
    }

    fn invalid(text: &str) -> Self {
        ProtocolInfo {
            protocol: String::new(),
            mask: String::new(),
            content_type: String::new(),
            extra: text.to_string(),
            dlna: DlnaParams::default(),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn dlna(&self) -> &DlnaParams {
        &self.dlna
    }

    /// The fourth field in canonical form, re-emitting only the fields that are set.
    pub fn extra(&self) -> String {
        if !self.valid {
            return self.extra.clone();
        }
        if self.dlna.is_empty() {
            return "*".to_string();
        }
        self.dlna.fields().join(";")
    }

    /// Wildcard-aware compatibility check.
    ///
    /// When both sides carry a `DLNA.ORG_PN` it decides the match on its own;
    /// otherwise protocol, mask and content type must be equal or `*`.
    pub fn matches(&self, other: &ProtocolInfo) -> bool {
        if !self.valid || !other.valid {
            return false;
        }

        if let (Some(a), Some(b)) = (&self.dlna.pn, &other.dlna.pn) {
            return a == b;
        }

        wildcard_eq(&self.protocol, &other.protocol)
            && wildcard_eq(&self.mask, &other.mask)
            && wildcard_eq(&self.content_type, &other.content_type)
    }
}

impl fmt::Display for ProtocolInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid && self.protocol.is_empty() {
            return f.write_str(&self.extra);
        }
        write!(
            f,
            "{}:{}:{}:{}",
            self.protocol,
            self.mask,
            self.content_type,
            self.extra()
        )
    }
}

impl From<&str> for ProtocolInfo {
    fn from(text: &str) -> Self {
        ProtocolInfo::parse(text)
    }
}

fn wildcard_eq(a: &str, b: &str) -> bool {
    a == "*" || b == "*" || a.eq_ignore_ascii_case(b)
}

/// Parse the fourth field. `None` marks a structural violation.
fn parse_extra(extra: &str) -> Option<DlnaParams> {
    let mut dlna = DlnaParams::default();
    if extra == "*" {
        return Some(dlna);
    }
    if extra.is_empty() {
        return None;
    }

    let mut last_stage = Stage::Pn;
    for field in extra.split(';').filter(|f| !f.is_empty()) {
        let (key, value) = match field.split_once('=') {
            Some(kv) => kv,
            None => {
                if Stage::for_key(field) != Stage::Other {
                    return None;
                }
                warn!("Skipping malformed protocolInfo field '{}'", field);
                continue;
            }
        };

        let stage = Stage::for_key(key);
        if stage < last_stage {
            debug!("protocolInfo field '{}' is out of order", key);
            return None;
        }

        match stage {
            Stage::Pn if is_valid_pn(value) => dlna.pn = Some(value.to_string()),
            Stage::Op if is_valid_op(value) => dlna.op = Some(value.to_string()),
            Stage::Ps if is_valid_ps(value) => dlna.ps = Some(value.to_string()),
            Stage::Ci if value == "0" || value == "1" => dlna.ci = Some(value.to_string()),
            Stage::Flags if is_valid_flags(value) => dlna.flags = Some(value.to_string()),
            Stage::MaxSp if is_valid_maxsp(value) => dlna.maxsp = Some(value.to_string()),
            Stage::Other => {
                if is_valid_other_key(key) && is_valid_other_value(value) {
                    dlna.others.push((key.to_string(), value.to_string()));
                } else {
                    warn!("Skipping invalid protocolInfo field '{}'", field);
                }
            }
            _ => {
                debug!("Malformed protocolInfo field '{}'", field);
                return None;
            }
        }
        last_stage = stage;
    }

    Some(dlna)
}

fn is_valid_pn(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_op(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|c| c == '0' || c == '1')
}

fn is_valid_ps(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '/' | ','))
}

fn is_valid_flags(value: &str) -> bool {
    value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_valid_maxsp(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_digit() || c == '.')
        && value.matches('.').count() <= 1
}

/// Vendor keys look like `<registered-prefix>_<NAME>`.
fn is_valid_other_key(key: &str) -> bool {
    match key.split_once('_') {
        Some((prefix, name)) => {
            !prefix.is_empty()
                && !name.is_empty()
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
                && name.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

fn is_valid_other_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ',' | '/' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pn_after_op_is_invalid() {
        let info = ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_OP=01;DLNA.ORG_PN=MP3");
        assert!(!info.is_valid());
    }

    #[test]
    fn test_canonical_form_is_idempotent() {
        let text = "http-get:*:audio/mpeg:DLNA.ORG_PN=MP3;DLNA.ORG_OP=01;DLNA.ORG_CI=0";
        let info = ProtocolInfo::parse(text);
        assert!(info.is_valid());
        assert_eq!(info.to_string(), text);
        assert_eq!(ProtocolInfo::parse(&info.to_string()).to_string(), text);
    }

    #[test]
    fn test_wrong_field_count() {
        assert!(!ProtocolInfo::parse("http-get:*:audio/mpeg").is_valid());
        assert!(!ProtocolInfo::parse("http-get:*:audio/mpeg:*:extra").is_valid());
    }

    #[test]
    fn test_wildcard_extra() {
        let info = ProtocolInfo::parse("http-get:*:image/jpeg:*");
        assert!(info.is_valid());
        assert_eq!(info.extra(), "*");
        assert_eq!(info.content_type(), "image/jpeg");
    }

    #[test]
    fn test_op_without_pn_is_allowed() {
        let info = ProtocolInfo::parse("http-get:*:video/x-matroska:DLNA.ORG_OP=01;DLNA.ORG_CI=0");
        assert!(info.is_valid());
        assert_eq!(info.dlna().op.as_deref(), Some("01"));
        assert!(info.dlna().pn.is_none());
    }

    #[test]
    fn test_malformed_first_class_field_invalidates() {
        assert!(!ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_OP=3").is_valid());
        assert!(!ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_CI=2").is_valid());
        assert!(!ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_FLAGS=0170").is_valid());
        assert!(!ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_PN").is_valid());
    }

    #[test]
    fn test_bad_vendor_field_is_skipped() {
        let info = ProtocolInfo::parse(
            "http-get:*:audio/mpeg:DLNA.ORG_PN=MP3;microsoft.com_BAD=va lue;sony.com_PROFILE=abc",
        );
        assert!(info.is_valid());
        assert_eq!(
            info.dlna().others,
            vec![("sony.com_PROFILE".to_string(), "abc".to_string())]
        );
        assert_eq!(
            info.to_string(),
            "http-get:*:audio/mpeg:DLNA.ORG_PN=MP3;sony.com_PROFILE=abc"
        );
    }

    #[test]
    fn test_first_class_after_vendor_is_invalid() {
        let info = ProtocolInfo::parse("http-get:*:audio/mpeg:sony.com_X=1;DLNA.ORG_CI=0");
        assert!(!info.is_valid());
    }

    #[test]
    fn test_full_flags_round_trip() {
        let text = "http-get:*:video/mpeg:DLNA.ORG_PN=MPEG_PS_PAL;DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000";
        let info = ProtocolInfo::parse(text);
        assert!(info.is_valid());
        assert_eq!(info.to_string(), text);
    }

    #[test]
    fn test_match_by_profile() {
        let mp3 = ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_PN=MP3");
        let other_mp3 = ProtocolInfo::parse("http-get:*:audio/x-mpeg:DLNA.ORG_PN=MP3;DLNA.ORG_OP=01");
        let lpcm = ProtocolInfo::parse("http-get:*:audio/mpeg:DLNA.ORG_PN=LPCM");
        assert!(mp3.matches(&other_mp3));
        assert!(!mp3.matches(&lpcm));
    }

    #[test]
    fn test_match_wildcards() {
        let sink = ProtocolInfo::parse("http-get:*:*:*");
        let jpeg = ProtocolInfo::parse("http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_LRG");
        let rtsp = ProtocolInfo::parse("rtsp-rtp-udp:*:image/jpeg:*");
        assert!(sink.matches(&jpeg));
        assert!(!sink.matches(&rtsp));
        assert!(!sink.matches(&ProtocolInfo::parse("garbage")));
    }
}
