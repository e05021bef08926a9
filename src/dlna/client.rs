use axum::http::HeaderMap;
use headers::{HeaderMapExt, Host, UserAgent};
use std::net::IpAddr;

/// Known renderer families that need special treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProfile {
    Generic,
    Xbox360,
    Ps3,
    Sonos,
    WindowsMediaPlayer,
}

/// Object-building quirks for picky renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientQuirks {
    /// Every container is reported as `object.container.storageFolder`.
    pub only_storage_folder: bool,
    /// Video items use plain `object.item.videoItem`.
    pub basic_video_class: bool,
    /// Video items without an album get `[Unknown Series]`.
    pub unknown_series: bool,
}

/// What the server knows about the control point or renderer issuing a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub server: Option<String>,
    pub av_client_info: Option<String>,
    /// Local address the request was sent to, taken from the `Host` header.
    pub local_addr: Option<IpAddr>,
}

impl ClientContext {
    /// Context for requests that carry no identifying headers.
    pub fn generic() -> Self {
        Self::default()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        let local_addr = headers.typed_get::<Host>().and_then(|host| {
            host.hostname()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .ok()
        });

        ClientContext {
            user_agent: headers
                .typed_get::<UserAgent>()
                .map(|ua| ua.as_str().to_string()),
            server: raw("server"),
            av_client_info: raw("x-av-client-info"),
            local_addr,
        }
    }

    pub fn with_user_agent(user_agent: &str) -> Self {
        ClientContext {
            user_agent: Some(user_agent.to_string()),
            ..Self::default()
        }
    }

    pub fn profile(&self) -> ClientProfile {
        client_override(self)
            .map(|o| o.profile)
            .unwrap_or(ClientProfile::Generic)
    }

    pub fn quirks(&self) -> ClientQuirks {
        client_override(self).map(|o| o.quirks).unwrap_or_default()
    }

    /// Key separating cached listings built for different profiles and request
    /// addresses. Only an address among `served` changes resource ordering, so
    /// any other `Host` value shares the plain profile key.
    pub fn cache_key(&self, served: &[IpAddr]) -> String {
        match self.local_addr.filter(|addr| served.contains(addr)) {
            Some(addr) => format!("{:?}@{}", self.profile(), addr),
            None => format!("{:?}", self.profile()),
        }
    }

    fn user_agent_contains(&self, needle: &str) -> bool {
        self.user_agent
            .as_deref()
            .map(|ua| ua.contains(needle))
            .unwrap_or(false)
    }

    fn server_contains(&self, needle: &str) -> bool {
        self.server
            .as_deref()
            .map(|s| s.contains(needle))
            .unwrap_or(false)
    }
}

/// Per-client MIME, DLNA and quirk overrides.
pub struct ClientOverride {
    pub profile: ClientProfile,
    pub matches: fn(&ClientContext) -> bool,
    /// Extension (lowercase) to MIME type.
    pub mime_by_extension: &'static [(&'static str, &'static str)],
    /// MIME type to DLNA fourth field.
    pub dlna_by_mime: &'static [(&'static str, &'static str)],
    pub quirks: ClientQuirks,
}

impl ClientOverride {
    pub fn mime_for_extension(&self, ext: &str) -> Option<&'static str> {
        self.mime_by_extension
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| *mime)
    }

    pub fn dlna_for_mime(&self, mime: &str) -> Option<&'static str> {
        self.dlna_by_mime
            .iter()
            .find(|(m, _)| *m == mime)
            .map(|(_, dlna)| *dlna)
    }
}

fn is_xbox(ctx: &ClientContext) -> bool {
    ctx.user_agent_contains("Xbox") || ctx.user_agent_contains("Xenon") || ctx.server_contains("Xbox")
}

fn is_ps3(ctx: &ClientContext) -> bool {
    ctx.av_client_info
        .as_deref()
        .map(|info| info.contains("PLAYSTATION 3"))
        .unwrap_or(false)
        || ctx.user_agent_contains("PLAYSTATION 3")
}

fn is_sonos(ctx: &ClientContext) -> bool {
    ctx.user_agent_contains("Sonos")
}

fn is_windows_media_player(ctx: &ClientContext) -> bool {
    ctx.user_agent_contains("Windows-Media-Player")
}

/// Evaluated in order; the first matching predicate wins.
pub static CLIENT_OVERRIDES: &[ClientOverride] = &[
    ClientOverride {
        profile: ClientProfile::Xbox360,
        matches: is_xbox,
        mime_by_extension: &[
            ("avi", "video/avi"),
            ("divx", "video/avi"),
            ("xvid", "video/avi"),
        ],
        dlna_by_mime: &[],
        quirks: ClientQuirks {
            only_storage_folder: true,
            basic_video_class: true,
            unknown_series: false,
        },
    },
    ClientOverride {
        profile: ClientProfile::Ps3,
        matches: is_ps3,
        mime_by_extension: &[
            ("avi", "video/x-msvideo"),
            ("divx", "video/divx"),
            ("xvid", "video/divx"),
            ("mov", "video/quicktime"),
        ],
        dlna_by_mime: &[
            ("video/x-msvideo", "DLNA.ORG_PN=AVI;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
            ("video/divx", "DLNA.ORG_PN=AVI;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
            ("video/x-matroska", "DLNA.ORG_PN=MATROSKA;DLNA.ORG_OP=01;DLNA.ORG_CI=0"),
        ],
        quirks: ClientQuirks {
            only_storage_folder: false,
            basic_video_class: false,
            unknown_series: false,
        },
    },
    ClientOverride {
        profile: ClientProfile::Sonos,
        matches: is_sonos,
        mime_by_extension: &[("wav", "audio/wav")],
        dlna_by_mime: &[],
        quirks: ClientQuirks {
            only_storage_folder: false,
            basic_video_class: false,
            unknown_series: false,
        },
    },
    ClientOverride {
        profile: ClientProfile::WindowsMediaPlayer,
        matches: is_windows_media_player,
        mime_by_extension: &[],
        dlna_by_mime: &[],
        quirks: ClientQuirks {
            only_storage_folder: false,
            basic_video_class: false,
            unknown_series: true,
        },
    },
];

pub fn client_override(ctx: &ClientContext) -> Option<&'static ClientOverride> {
    CLIENT_OVERRIDES.iter().find(|o| (o.matches)(ctx))
}
