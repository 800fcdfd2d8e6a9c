//! Point-in-time views of the live cache contents.
//!
//! On the wire a snapshot is a JSON object mapping each key to
//! `{"key", "value", "expiration"}`, where `expiration` is an RFC 3339 string.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

use crate::cache::entry::format_timestamp_ms;

/// One live entry as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub value: String,
    /// Expiration instant (Unix milliseconds)
    pub expires_at: u64,
}

/// Immutable copy of every live entry, tagged with the store version it was
/// taken at. Versions only grow, so a higher version is always the newer view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    version: u64,
    entries: HashMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn new(version: u64, entries: HashMap<String, SnapshotEntry>) -> Self {
        Self { version, entries }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this snapshot without the entries that have expired by `now_ms`.
    ///
    /// The version is kept: dropping expired entries changes nothing a
    /// mutation would.
    pub fn live_at(&self, now_ms: u64) -> Snapshot {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| now_ms < entry.expires_at)
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        Snapshot::new(self.version, entries)
    }

    /// True if any entry has expired by `now_ms`.
    pub fn has_expired_at(&self, now_ms: u64) -> bool {
        self.entries.values().any(|entry| now_ms >= entry.expires_at)
    }

    /// Serializes the snapshot into the feed's JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

struct WireItem<'a> {
    key: &'a str,
    entry: &'a SnapshotEntry,
}

impl Serialize for WireItem<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut item = serializer.serialize_struct("CacheItem", 3)?;
        item.serialize_field("key", self.key)?;
        item.serialize_field("value", &self.entry.value)?;
        item.serialize_field("expiration", &format_timestamp_ms(self.entry.expires_at))?;
        item.end()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, &WireItem { key, entry })?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_empty_snapshot_serializes_to_empty_object() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.to_json().unwrap(), "{}");
        assert_eq!(snapshot.version(), 0);
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let mut entries = HashMap::new();
        entries.insert(
            "greeting".to_string(),
            SnapshotEntry {
                value: "hello".to_string(),
                expires_at: 60_000,
            },
        );
        let snapshot = Snapshot::new(3, entries);

        let json: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        let item = &json["greeting"];
        assert_eq!(item["key"], "greeting");
        assert_eq!(item["value"], "hello");
        assert_eq!(item["expiration"], "1970-01-01T00:01:00.000Z");
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_live_at_drops_expired_entries() {
        let mut entries = HashMap::new();
        for (key, expires_at) in [("stale", 1_000), ("edge", 2_000), ("fresh", 3_000)] {
            entries.insert(
                key.to_string(),
                SnapshotEntry {
                    value: "v".to_string(),
                    expires_at,
                },
            );
        }
        let snapshot = Snapshot::new(7, entries);
        assert!(snapshot.has_expired_at(2_000));
        assert!(!snapshot.has_expired_at(999));

        let live = snapshot.live_at(2_000);

        assert_eq!(live.version(), 7);
        assert_eq!(live.len(), 1);
        assert!(live.contains_key("fresh"));
        assert!(!live.has_expired_at(2_000));
    }
}
