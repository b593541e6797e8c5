use crate::models::{NotificationFilter, NotificationRecord};
use crate::services::UnreadCounter;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Where a merged batch lands relative to records sharing its timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Push events and refreshes: newest-first batch in front of its ties
    Prepend,
    /// Pagination continuation: older batch behind its ties
    AppendOlder,
}

/// Result of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Ids of the records that were inserted, in batch order
    pub inserted: Vec<String>,
    /// Records skipped because their id was already present
    pub duplicates: usize,
}

// Newest first; ties ordered by placement sequence.
type OrderKey = (Reverse<DateTime<Utc>>, i64);

#[derive(Debug)]
struct Entry {
    record: NotificationRecord,
    key: OrderKey,
}

/// In-memory notification collection keyed by id and kept in descending
/// `created_at` order. Every mutation feeds a signed delta into the
/// store's [`UnreadCounter`].
///
/// None of the operations fail: unknown ids are ignored, since a stale UI
/// action can race with a removal.
#[derive(Debug)]
pub struct NotificationStore {
    entries: HashMap<String, Entry>,
    order: BTreeMap<OrderKey, String>,
    front_seq: i64,
    back_seq: i64,
    unread: UnreadCounter,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            front_seq: 0,
            back_seq: 0,
            unread: UnreadCounter::new(),
        }
    }

    /// Insert records whose id is not yet present. Existing records are
    /// never overwritten (first write wins), including duplicates inside
    /// the batch itself.
    pub fn merge(&mut self, records: Vec<NotificationRecord>, placement: Placement) -> MergeOutcome {
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        let mut fresh = Vec::with_capacity(records.len());
        for record in records {
            if self.entries.contains_key(&record.id) || !seen.insert(record.id.clone()) {
                tracing::debug!("Skipping duplicate notification {}", record.id);
                duplicates += 1;
            } else {
                fresh.push(record);
            }
        }

        let inserted: Vec<String> = fresh.iter().map(|r| r.id.clone()).collect();
        let mut unread_delta = 0i64;

        match placement {
            Placement::Prepend => {
                // Walk backwards so the first record of the batch gets the
                // smallest sequence and sorts first among equal timestamps.
                for record in fresh.into_iter().rev() {
                    self.front_seq -= 1;
                    let seq = self.front_seq;
                    unread_delta += self.insert(record, seq);
                }
            }
            Placement::AppendOlder => {
                for record in fresh {
                    self.back_seq += 1;
                    let seq = self.back_seq;
                    unread_delta += self.insert(record, seq);
                }
            }
        }

        self.unread.apply(unread_delta);
        metrics::counter!("notisync_records_merged_total").increment(inserted.len() as u64);
        if duplicates > 0 {
            metrics::counter!("notisync_duplicates_skipped_total").increment(duplicates as u64);
        }

        MergeOutcome {
            inserted,
            duplicates,
        }
    }

    fn insert(&mut self, record: NotificationRecord, seq: i64) -> i64 {
        let key = (Reverse(record.created_at), seq);
        let delta = if record.is_read { 0 } else { 1 };
        self.order.insert(key, record.id.clone());
        self.entries.insert(record.id.clone(), Entry { record, key });
        delta
    }

    /// Replace the whole loaded window with a fresh first page. Ids that
    /// were already read locally stay read even if the page says otherwise.
    pub fn replace_window(&mut self, records: Vec<NotificationRecord>) -> MergeOutcome {
        let read_locally: HashSet<String> = self
            .entries
            .values()
            .filter(|e| e.record.is_read)
            .map(|e| e.record.id.clone())
            .collect();

        let previous_unread = self.unread.value() as i64;
        self.entries.clear();
        self.order.clear();
        self.front_seq = 0;
        self.back_seq = 0;
        self.unread.apply(-previous_unread);

        let records = records
            .into_iter()
            .map(|mut record| {
                if read_locally.contains(&record.id) {
                    record.is_read = true;
                }
                record
            })
            .collect();

        self.merge(records, Placement::AppendOlder)
    }

    /// Mark one record read. Returns whether anything changed.
    pub fn apply_read_transition(&mut self, id: &str) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.record.is_read => {
                entry.record.is_read = true;
                self.unread.apply(-1);
                true
            }
            _ => false,
        }
    }

    /// Mark every loaded record read. Returns how many were unread.
    pub fn apply_read_all_transition(&mut self) -> usize {
        let mut changed = 0usize;
        for entry in self.entries.values_mut() {
            if !entry.record.is_read {
                entry.record.is_read = true;
                changed += 1;
            }
        }
        self.unread.apply(-(changed as i64));
        changed
    }

    /// Remove a record, returning it if it was present
    pub fn remove(&mut self, id: &str) -> Option<NotificationRecord> {
        let entry = self.entries.remove(id)?;
        self.order.remove(&entry.key);
        if !entry.record.is_read {
            self.unread.apply(-1);
        }
        Some(entry.record)
    }

    /// Ordered view of the loaded records, newest first
    pub fn snapshot(&self, filter: NotificationFilter) -> Vec<NotificationRecord> {
        self.order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|e| &e.record)
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&NotificationRecord> {
        self.entries.get(id).map(|e| &e.record)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.unread.value()
    }

    /// Read handle onto this store's unread count
    pub fn unread_counter(&self) -> UnreadCounter {
        self.unread.clone()
    }

    /// Drop everything, e.g. on logout
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.front_seq = 0;
        self.back_seq = 0;
        self.unread.reset();
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use chrono::{Duration, TimeZone};

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 13, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn record(id: &str, minute: i64) -> NotificationRecord {
        NotificationRecord::new(id, NotificationKind::NewMessage, format!("msg {}", id), ts(minute))
    }

    fn ids(store: &NotificationStore, filter: NotificationFilter) -> Vec<String> {
        store.snapshot(filter).into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_duplicate_push_is_ignored() {
        let mut store = NotificationStore::new();
        let outcome = store.merge(vec![record("1", 1)], Placement::Prepend);
        assert_eq!(outcome.inserted, vec!["1".to_string()]);
        assert_eq!(store.unread_count(), 1);

        let outcome = store.merge(vec![record("1", 1)], Placement::Prepend);
        assert!(outcome.inserted.is_empty());
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_first_write_wins() {
        let mut store = NotificationStore::new();
        store.merge(vec![record("1", 1).with_message("original")], Placement::AppendOlder);
        store.merge(vec![record("1", 1).with_message("from push")], Placement::Prepend);
        assert_eq!(store.get("1").unwrap().message, "original");
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let mut store = NotificationStore::new();
        let outcome = store.merge(
            vec![record("1", 5).with_message("first"), record("1", 5).with_message("second")],
            Placement::Prepend,
        );
        assert_eq!(outcome.inserted.len(), 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(store.get("1").unwrap().message, "first");
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_snapshot_is_newest_first_regardless_of_arrival() {
        let mut store = NotificationStore::new();
        store.merge(vec![record("b", 2), record("a", 1)], Placement::AppendOlder);
        store.merge(vec![record("old", -10)], Placement::Prepend);
        store.merge(vec![record("new", 10)], Placement::AppendOlder);
        assert_eq!(ids(&store, NotificationFilter::All), vec!["new", "b", "a", "old"]);
    }

    #[test]
    fn test_ties_follow_placement() {
        let mut store = NotificationStore::new();
        store.merge(vec![record("mid", 0)], Placement::AppendOlder);
        store.merge(vec![record("front1", 0), record("front2", 0)], Placement::Prepend);
        store.merge(vec![record("back", 0)], Placement::AppendOlder);
        assert_eq!(
            ids(&store, NotificationFilter::All),
            vec!["front1", "front2", "mid", "back"]
        );
    }

    #[test]
    fn test_read_transition_is_idempotent() {
        let mut store = NotificationStore::new();
        store.merge(vec![record("1", 1), record("2", 0)], Placement::AppendOlder);

        assert!(store.apply_read_transition("1"));
        assert!(!store.apply_read_transition("1"));
        assert!(!store.apply_read_transition("missing"));
        assert_eq!(store.unread_count(), 1);
        assert_eq!(ids(&store, NotificationFilter::UnreadOnly), vec!["2"]);
    }

    #[test]
    fn test_read_all_transition() {
        let mut store = NotificationStore::new();
        store.merge(
            vec![record("1", 3), record("2", 2).read(), record("3", 1)],
            Placement::AppendOlder,
        );
        assert_eq!(store.unread_count(), 2);
        assert_eq!(store.apply_read_all_transition(), 2);
        assert_eq!(store.unread_count(), 0);
        assert!(store.snapshot(NotificationFilter::UnreadOnly).is_empty());
        assert_eq!(store.apply_read_all_transition(), 0);
    }

    #[test]
    fn test_remove_adjusts_unread() {
        let mut store = NotificationStore::new();
        store.merge(vec![record("1", 1), record("2", 0).read()], Placement::AppendOlder);

        assert!(store.remove("2").is_some());
        assert_eq!(store.unread_count(), 1);
        assert!(store.remove("1").is_some());
        assert_eq!(store.unread_count(), 0);
        assert!(store.remove("1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_window_keeps_local_reads() {
        let mut store = NotificationStore::new();
        store.merge(vec![record("1", 3), record("2", 2), record("3", 1)], Placement::AppendOlder);
        store.apply_read_transition("2");

        // server has not caught up with the read of "2" yet
        store.replace_window(vec![record("4", 4), record("2", 2), record("1", 3)]);

        assert_eq!(ids(&store, NotificationFilter::All), vec!["4", "1", "2"]);
        assert!(store.get("2").unwrap().is_read);
        assert!(!store.contains("3"));
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn test_clear_resets_counter() {
        let mut store = NotificationStore::new();
        let counter = store.unread_counter();
        store.merge(vec![record("1", 1), record("2", 2)], Placement::Prepend);
        assert_eq!(counter.value(), 2);
        store.clear();
        assert_eq!(counter.value(), 0);
        assert!(store.is_empty());
    }
}
