use std::ops::{BitOr, BitOrAssign};

/// Set of optional DIDL-Lite properties a control point asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FilterMask(u64);

impl FilterMask {
    pub const NONE: FilterMask = FilterMask(0);
    pub const ALL: FilterMask = FilterMask(u64::MAX);

    pub const CREATOR: FilterMask = FilterMask(1 << 0);
    pub const ARTIST: FilterMask = FilterMask(1 << 1);
    pub const ALBUM: FilterMask = FilterMask(1 << 2);
    pub const GENRE: FilterMask = FilterMask(1 << 3);
    pub const ALBUMARTURI: FilterMask = FilterMask(1 << 4);
    pub const DESCRIPTION: FilterMask = FilterMask(1 << 5);
    pub const SEARCHABLE: FilterMask = FilterMask(1 << 6);
    pub const CHILDCOUNT: FilterMask = FilterMask(1 << 7);
    pub const ORIGINALTRACK: FilterMask = FilterMask(1 << 8);
    pub const ACTOR: FilterMask = FilterMask(1 << 9);
    pub const AUTHOR: FilterMask = FilterMask(1 << 10);
    pub const DATE: FilterMask = FilterMask(1 << 11);
    pub const PROGRAMTITLE: FilterMask = FilterMask(1 << 12);
    pub const SERIESTITLE: FilterMask = FilterMask(1 << 13);
    pub const EPISODE: FilterMask = FilterMask(1 << 14);
    pub const TITLE: FilterMask = FilterMask(1 << 15);
    pub const RES: FilterMask = FilterMask(1 << 16);
    pub const RES_DURATION: FilterMask = FilterMask(1 << 17);
    pub const RES_SIZE: FilterMask = FilterMask(1 << 18);
    pub const RES_PROTECTION: FilterMask = FilterMask(1 << 19);
    pub const RES_RESOLUTION: FilterMask = FilterMask(1 << 20);
    pub const RES_BITRATE: FilterMask = FilterMask(1 << 21);
    pub const RES_BITSPERSAMPLE: FilterMask = FilterMask(1 << 22);
    pub const RES_NRAUDIOCHANNELS: FilterMask = FilterMask(1 << 23);
    pub const RES_SAMPLEFREQUENCY: FilterMask = FilterMask(1 << 24);
    pub const LONGDESCRIPTION: FilterMask = FilterMask(1 << 25);
    pub const TOC: FilterMask = FilterMask(1 << 26);

    /// Parse a Browse/Search `Filter` argument. Unknown names are ignored.
    pub fn parse(filter: &str) -> FilterMask {
        let mut mask = FilterMask::NONE;
        for name in filter.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if name == "*" {
                return FilterMask::ALL;
            }
            mask |= Self::for_name(name);
        }
        mask
    }

    fn for_name(name: &str) -> FilterMask {
        match name {
            "dc:creator" => FilterMask::CREATOR,
            "upnp:artist" | "upnp:artist@role" => FilterMask::ARTIST,
            "upnp:actor" | "upnp:actor@role" => FilterMask::ACTOR,
            "upnp:author" | "upnp:author@role" => FilterMask::AUTHOR,
            "upnp:album" => FilterMask::ALBUM,
            "upnp:genre" => FilterMask::GENRE,
            "upnp:albumArtURI" | "upnp:albumArtURI@dlna:profileID" => FilterMask::ALBUMARTURI,
            "dc:description" => FilterMask::DESCRIPTION,
            "upnp:longDescription" => FilterMask::LONGDESCRIPTION,
            "@searchable" | "searchable" | "container@searchable" => FilterMask::SEARCHABLE,
            "@childCount" | "childCount" | "container@childCount" => FilterMask::CHILDCOUNT,
            "upnp:originalTrackNumber" => FilterMask::ORIGINALTRACK,
            "dc:date" => FilterMask::DATE,
            "upnp:programTitle" => FilterMask::PROGRAMTITLE,
            "upnp:seriesTitle" => FilterMask::SERIESTITLE,
            "upnp:episodeNumber" => FilterMask::EPISODE,
            "upnp:toc" => FilterMask::TOC,
            "dc:title" => FilterMask::TITLE,
            "res" => FilterMask::RES,
            "res@duration" | "@duration" => FilterMask::RES | FilterMask::RES_DURATION,
            "res@size" | "@size" => FilterMask::RES | FilterMask::RES_SIZE,
            "res@protection" | "@protection" => FilterMask::RES | FilterMask::RES_PROTECTION,
            "res@resolution" | "@resolution" => FilterMask::RES | FilterMask::RES_RESOLUTION,
            "res@bitrate" | "@bitrate" => FilterMask::RES | FilterMask::RES_BITRATE,
            "res@bitsPerSample" | "@bitsPerSample" => {
                FilterMask::RES | FilterMask::RES_BITSPERSAMPLE
            }
            "res@nrAudioChannels" | "@nrAudioChannels" => {
                FilterMask::RES | FilterMask::RES_NRAUDIOCHANNELS
            }
            "res@sampleFrequency" | "@sampleFrequency" => {
                FilterMask::RES | FilterMask::RES_SAMPLEFREQUENCY
            }
            _ => FilterMask::NONE,
        }
    }

    pub fn contains(self, other: FilterMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

impl BitOr for FilterMask {
    type Output = FilterMask;

    fn bitor(self, rhs: FilterMask) -> FilterMask {
        FilterMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for FilterMask {
    fn bitor_assign(&mut self, rhs: FilterMask) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_is_all() {
        assert_eq!(FilterMask::parse("*"), FilterMask::ALL);
        assert!(FilterMask::parse("dc:title,*").contains(FilterMask::RES_SIZE));
    }

    #[test]
    fn test_union_and_unknown_names() {
        let mask = FilterMask::parse("dc:creator, upnp:album ,foo:bar,res@size");
        assert!(mask.contains(FilterMask::CREATOR));
        assert!(mask.contains(FilterMask::ALBUM));
        assert!(mask.contains(FilterMask::RES));
        assert!(mask.contains(FilterMask::RES_SIZE));
        assert!(!mask.contains(FilterMask::RES_DURATION));
        assert!(!mask.contains(FilterMask::ARTIST));
    }

    #[test]
    fn test_empty_filter() {
        assert_eq!(FilterMask::parse(""), FilterMask::NONE);
        assert_eq!(FilterMask::parse("bogus"), FilterMask::NONE);
    }
}
