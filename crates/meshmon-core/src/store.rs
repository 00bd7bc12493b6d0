use crate::record::Record;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Latest record per message type for a single sender.
///
/// Types iterate in the order they were first seen; a later record for a known
/// type replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeEntry {
    sender: String,
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl NodeEntry {
    fn new(sender: String) -> Self {
        Self {
            sender,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn upsert(&mut self, record: Record) {
        match self.index.get(&record.kind) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(record.kind.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn get(&self, kind: &str) -> Option<&Record> {
        self.index.get(kind).map(|&slot| &self.records[slot])
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record with the greatest arrival time; the earliest-seen type wins ties.
    pub fn latest(&self) -> Option<&Record> {
        self.records.iter().fold(None, |best: Option<&Record>, record| match best {
            Some(current) if current.arrival_time >= record.arrival_time => Some(current),
            _ => Some(record),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Last-write-wins cache of node -> type -> record. Never evicts.
#[derive(Debug, Clone, Default)]
pub struct AggregationStore {
    nodes: HashMap<String, NodeEntry>,
    last_update: Option<DateTime<Utc>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: Record, now: DateTime<Utc>) {
        self.nodes
            .entry(record.sender.clone())
            .or_insert_with_key(|sender| NodeEntry::new(sender.clone()))
            .upsert(record);
        self.last_update = Some(now);
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            last_update: self.last_update,
        }
    }

    pub fn get(&self, sender: &str, kind: &str) -> Option<&Record> {
        self.nodes.get(sender).and_then(|node| node.get(kind))
    }

    pub fn node(&self, sender: &str) -> Option<&NodeEntry> {
        self.nodes.get(sender)
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn record_count(&self) -> usize {
        self.nodes.values().map(NodeEntry::len).sum()
    }
}

/// Owned point-in-time copy of the store. Node order is unspecified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub nodes: Vec<NodeEntry>,
    pub last_update: Option<DateTime<Utc>>,
}

impl StoreSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{decode_value, FieldValue, IgnoreSet};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_770_000_000 + secs, 0).unwrap()
    }

    fn record(value: Value, at: DateTime<Utc>) -> Record {
        decode_value(value, &IgnoreSet::new(), at).expect("decode")
    }

    #[test]
    fn upsert_keeps_only_the_last_record_per_sender_and_type() {
        let mut store = AggregationStore::new();
        store.upsert(record(json!({"type": "status", "sender": "A", "battery": 80}), t(0)), t(0));
        store.upsert(record(json!({"type": "status", "sender": "A", "battery": 60}), t(5)), t(5));

        assert_eq!(store.node_count(), 1);
        assert_eq!(store.record_count(), 1);
        let latest = store.get("A", "status").expect("record");
        assert_eq!(latest.field("battery"), Some(&FieldValue::Number(60.into())));
        assert_eq!(store.last_update(), Some(t(5)));
    }

    #[test]
    fn identical_payload_still_overwrites_and_bumps_clock() {
        let mut store = AggregationStore::new();
        let payload = json!({"type": "status", "sender": "A"});
        store.upsert(record(payload.clone(), t(0)), t(0));
        store.upsert(record(payload, t(30)), t(30));

        assert_eq!(store.get("A", "status").map(|r| r.arrival_time), Some(t(30)));
        assert_eq!(store.last_update(), Some(t(30)));
    }

    #[test]
    fn node_entry_preserves_first_seen_type_order() {
        let mut store = AggregationStore::new();
        store.upsert(record(json!({"type": "text", "sender": "A"}), t(0)), t(0));
        store.upsert(record(json!({"type": "position", "sender": "A"}), t(1)), t(1));
        store.upsert(record(json!({"type": "text", "sender": "A"}), t(2)), t(2));

        let kinds: Vec<&str> = store
            .node("A")
            .expect("node")
            .records()
            .iter()
            .map(|record| record.kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["text", "position"]);
    }

    #[test]
    fn latest_is_chosen_by_arrival_time_not_type_name() {
        let mut store = AggregationStore::new();
        store.upsert(record(json!({"type": "pos", "sender": "A"}), t(0)), t(0));
        store.upsert(record(json!({"type": "status", "sender": "A"}), t(100)), t(100));

        let latest = store.node("A").and_then(NodeEntry::latest).expect("latest");
        assert_eq!(latest.kind, "status");
    }

    #[test]
    fn latest_tie_prefers_first_seen_type() {
        let mut store = AggregationStore::new();
        store.upsert(record(json!({"type": "b", "sender": "A"}), t(7)), t(7));
        store.upsert(record(json!({"type": "a", "sender": "A"}), t(7)), t(7));

        let latest = store.node("A").and_then(NodeEntry::latest).expect("latest");
        assert_eq!(latest.kind, "b");
    }

    #[test]
    fn snapshot_is_unaffected_by_later_upserts() {
        let mut store = AggregationStore::new();
        store.upsert(record(json!({"type": "status", "sender": "A", "battery": 80}), t(0)), t(0));
        let snapshot = store.snapshot();

        store.upsert(record(json!({"type": "status", "sender": "A", "battery": 10}), t(1)), t(1));
        store.upsert(record(json!({"type": "status", "sender": "B"}), t(2)), t(2));

        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.last_update, Some(t(0)));
        let kept = snapshot.nodes[0].get("status").expect("status");
        assert_eq!(kept.field("battery"), Some(&FieldValue::Number(80.into())));
    }

    #[test]
    fn empty_store_has_no_last_update() {
        let store = AggregationStore::new();
        assert!(store.snapshot().is_empty());
        assert_eq!(store.last_update(), None);
    }
}
