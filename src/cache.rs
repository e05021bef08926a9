use crate::model::MediaObject;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub type MediaObjectList = Arc<Vec<MediaObject>>;

/// Object lists keyed by `upnp://<device>/<item>`. Entries live until cleared.
///
/// Several lists may be stored for one item under `<item>#<variant>` keys (see
/// [`variant_key`]); clearing the item drops all of them.
#[derive(Debug, Default)]
pub struct MediaCache {
    entries: Mutex<HashMap<String, MediaObjectList>>,
}

fn cache_key(device_id: &str, item_id: &str) -> String {
    format!("upnp://{}/{}", device_id, item_id)
}

/// Item id for one variant of an item's list, e.g. per client profile.
pub fn variant_key(item_id: &str, variant: &str) -> String {
    format!("{}#{}", item_id, variant)
}

impl MediaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, device_id: &str, item_id: &str, objects: MediaObjectList) {
        self.entries.lock().insert(cache_key(device_id, item_id), objects);
    }

    pub fn get(&self, device_id: &str, item_id: &str) -> Option<MediaObjectList> {
        self.entries.lock().get(&cache_key(device_id, item_id)).cloned()
    }

    /// Drop one entry, or every entry of the device when `item_id` is `None`.
    pub fn clear(&self, device_id: &str, item_id: Option<&str>) {
        let mut entries = self.entries.lock();
        match item_id {
            Some(item_id) => {
                let key = cache_key(device_id, item_id);
                let variants = format!("{}#", key);
                entries.retain(|k, _| *k != key && !k.starts_with(&variants));
            }
            None => {
                let prefix = format!("upnp://{}/", device_id);
                let before = entries.len();
                entries.retain(|key, _| !key.starts_with(&prefix));
                debug!(
                    "Cleared {} cached listings for device {}",
                    before - entries.len(),
                    device_id
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectBase;

    fn list(title: &str) -> MediaObjectList {
        Arc::new(vec![MediaObject::item(ObjectBase {
            title: title.to_string(),
            ..ObjectBase::default()
        })])
    }

    #[test]
    fn test_put_get() {
        let cache = MediaCache::new();
        assert!(cache.get("dev", "0").is_none());

        let objects = list("a");
        cache.put("dev", "0", objects.clone());
        let cached = cache.get("dev", "0").unwrap();
        assert!(Arc::ptr_eq(&cached, &objects));
        assert!(cache.get("other", "0").is_none());
    }

    #[test]
    fn test_clear_single_and_device() {
        let cache = MediaCache::new();
        cache.put("dev", "0", list("a"));
        cache.put("dev", "0/Sub", list("b"));
        cache.put("dev2", "0", list("c"));

        cache.clear("dev", Some("0/Sub"));
        assert!(cache.get("dev", "0/Sub").is_none());
        assert!(cache.get("dev", "0").is_some());

        cache.clear("dev", None);
        assert!(cache.get("dev", "0").is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.get("dev2", "0").is_some());
    }

    #[test]
    fn test_clear_item_drops_variants() {
        let cache = MediaCache::new();
        cache.put("dev", &variant_key("0/Sub", "Generic#false"), list("a"));
        cache.put("dev", &variant_key("0/Sub", "Xbox360#false"), list("b"));
        cache.put("dev", &variant_key("0/Subway", "Generic#false"), list("c"));
        cache.put("dev", "0/Sub", list("d"));

        cache.clear("dev", Some("0/Sub"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("dev", &variant_key("0/Subway", "Generic#false")).is_some());
    }

    #[test]
    fn test_device_prefix_does_not_overlap() {
        let cache = MediaCache::new();
        cache.put("dev", "0", list("a"));
        cache.put("dev-b", "0", list("b"));
        cache.clear("dev", None);
        assert!(cache.get("dev-b", "0").is_some());
    }
}
