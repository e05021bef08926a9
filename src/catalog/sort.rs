use crate::error::ActionError;
use crate::model::MediaObject;
use std::cmp::Ordering;

/// Properties the browser can actually order by.
pub const SORT_CAPABILITIES: &str = "dc:title,dc:date,dc:creator,upnp:class,upnp:artist,upnp:album,upnp:genre,upnp:originalTrackNumber";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// `namespace:property`, e.g. `dc:title`.
    pub property: String,
    pub ascending: bool,
}

/// Parse a `SortCriteria` argument such as `+upnp:album,-dc:date`.
///
/// An empty string or `*` means no ordering. Every token needs a `+`/`-`
/// prefix and a `namespace:property` name.
pub fn parse_sort(criteria: &str) -> Result<Vec<SortCriterion>, ActionError> {
    let criteria = criteria.trim();
    if criteria.is_empty() || criteria == "*" {
        return Ok(Vec::new());
    }

    criteria
        .split(',')
        .map(|token| {
            let token = token.trim();
            let (ascending, property) = if let Some(p) = token.strip_prefix('+') {
                (true, p)
            } else if let Some(p) = token.strip_prefix('-') {
                (false, p)
            } else {
                return Err(ActionError::InvalidSortCriteria);
            };

            match property.split_once(':') {
                Some((namespace, name))
                    if is_name(namespace) && is_name(name.trim_start_matches('@')) =>
                {
                    Ok(SortCriterion {
                        property: property.to_string(),
                        ascending,
                    })
                }
                _ => Err(ActionError::InvalidSortCriteria),
            }
        })
        .collect()
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
}

/// Stable sort by the given criteria. Unsupported properties are ignored.
pub fn sort_objects(objects: &mut [MediaObject], criteria: &[SortCriterion]) {
    let supported: Vec<&SortCriterion> = criteria
        .iter()
        .filter(|c| SORT_CAPABILITIES.split(',').any(|p| p == c.property))
        .collect();
    if supported.is_empty() {
        return;
    }

    objects.sort_by(|a, b| {
        supported.iter().fold(Ordering::Equal, |ordering, criterion| {
            ordering.then_with(|| {
                let ord = compare_by(a, b, &criterion.property);
                if criterion.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            })
        })
    });
}

fn compare_by(a: &MediaObject, b: &MediaObject, property: &str) -> Ordering {
    let (a, b) = (a.base(), b.base());
    let text = |x: &str, y: &str| x.to_lowercase().cmp(&y.to_lowercase());
    match property {
        "dc:title" => text(&a.title, &b.title),
        "dc:date" => a.date.cmp(&b.date),
        "dc:creator" => text(&a.creator, &b.creator),
        "upnp:class" => a.object_class.cmp(&b.object_class),
        "upnp:artist" => text(
            a.people.artists.first_name().unwrap_or(""),
            b.people.artists.first_name().unwrap_or(""),
        ),
        "upnp:album" => text(&a.affiliation.album, &b.affiliation.album),
        "upnp:genre" => text(
            a.affiliation.genres.first().map(String::as_str).unwrap_or(""),
            b.affiliation.genres.first().map(String::as_str).unwrap_or(""),
        ),
        "upnp:originalTrackNumber" => a
            .misc_info
            .original_track_number
            .cmp(&b.misc_info.original_track_number),
        _ => Ordering::Equal,
    }
}
