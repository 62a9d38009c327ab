//! Activity ledger: the local record of likes, saves and replies.
//!
//! Every mutation loads the record, applies a set operation, and writes the whole
//! record back only if the set actually changed. Counts are the set sizes, so a
//! failed write leaves nothing half-updated.

use std::sync::Arc;

use porch_common::models::{ActivityKind, ActivityRecord};
use porch_common::{PorchResult, StorageError};
use tracing::{debug, warn};

use crate::{ACTIVITY_KEY, KeyValueStore};

#[derive(Debug, Clone)]
pub struct ActivityLedger {
    store: Arc<dyn KeyValueStore>,
}

impl ActivityLedger {
    /// `store` must be the durable scope.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn record_like(&self, content_id: &str) -> PorchResult<bool> {
        self.record(ActivityKind::Like, content_id)
    }

    pub fn record_save(&self, content_id: &str) -> PorchResult<bool> {
        self.record(ActivityKind::Save, content_id)
    }

    pub fn record_reply(&self, content_id: &str) -> PorchResult<bool> {
        self.record(ActivityKind::Reply, content_id)
    }

    pub fn remove_like(&self, content_id: &str) -> PorchResult<bool> {
        self.remove(ActivityKind::Like, content_id)
    }

    pub fn remove_save(&self, content_id: &str) -> PorchResult<bool> {
        self.remove(ActivityKind::Save, content_id)
    }

    pub fn has_liked(&self, content_id: &str) -> bool {
        self.get_activity().contains(ActivityKind::Like, content_id)
    }

    pub fn has_saved(&self, content_id: &str) -> bool {
        self.get_activity().contains(ActivityKind::Save, content_id)
    }

    pub fn has_replied(&self, content_id: &str) -> bool {
        self.get_activity().contains(ActivityKind::Reply, content_id)
    }

    /// The current record, or an all-empty one if nothing was ever stored or it can't be read.
    pub fn get_activity(&self) -> ActivityRecord {
        match self.load() {
            Ok(record) => record,
            Err(e) => {
                warn!("Activity ledger unreadable, using empty record: {e}");
                ActivityRecord::default()
            }
        }
    }

    /// Drop the whole record.
    pub fn clear(&self) -> PorchResult<()> {
        self.store.remove(ACTIVITY_KEY)?;
        debug!("Activity ledger cleared");
        Ok(())
    }

    /// Add to a set. Returns `Ok(false)` when the id was already present (nothing written).
    pub fn record(&self, kind: ActivityKind, content_id: &str) -> PorchResult<bool> {
        self.mutate(|record| record.insert(kind, content_id))
            .inspect(|changed| {
                if *changed {
                    debug!("Recorded {kind:?} for {content_id}");
                }
            })
    }

    /// Remove from a set. Returns `Ok(false)` when the id was absent (nothing written).
    pub fn remove(&self, kind: ActivityKind, content_id: &str) -> PorchResult<bool> {
        self.mutate(|record| record.remove(kind, content_id))
            .inspect(|changed| {
                if *changed {
                    debug!("Removed {kind:?} for {content_id}");
                }
            })
    }

    fn mutate(&self, apply: impl FnOnce(&mut ActivityRecord) -> bool) -> PorchResult<bool> {
        let mut record = match self.load() {
            Ok(record) => record,
            // A corrupt record is replaced; an unavailable store aborts.
            Err(StorageError::Corrupt { .. }) => {
                warn!("Replacing corrupt activity ledger");
                ActivityRecord::default()
            }
            Err(e) => return Err(e.into()),
        };

        if !apply(&mut record) {
            return Ok(false);
        }

        let json = serde_json::to_string(&record).map_err(|e| anyhow::anyhow!(e))?;
        self.store.set(ACTIVITY_KEY, &json)?;
        Ok(true)
    }

    fn load(&self) -> Result<ActivityRecord, StorageError> {
        match self.store.get(ACTIVITY_KEY)? {
            None => Ok(ActivityRecord::default()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|_| StorageError::Corrupt { key: ACTIVITY_KEY.to_owned() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use porch_common::PorchError;

    fn ledger() -> (ActivityLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ActivityLedger::new(store.clone()), store)
    }

    #[test]
    fn empty_ledger_reads_as_zero_record() {
        let (ledger, _) = ledger();
        let activity = ledger.get_activity();
        assert_eq!(activity, ActivityRecord::default());
        assert_eq!((activity.likes(), activity.saves(), activity.replies()), (0, 0, 0));
    }

    #[test]
    fn record_like_is_idempotent() {
        let (ledger, store) = ledger();
        assert!(ledger.record_like("x").unwrap());
        let once = store.peek(ACTIVITY_KEY);

        assert!(!ledger.record_like("x").unwrap());
        assert_eq!(store.peek(ACTIVITY_KEY), once);
        assert_eq!(ledger.get_activity().likes(), 1);
        assert!(ledger.has_liked("x"));
    }

    #[test]
    fn removing_absent_like_changes_nothing() {
        let (ledger, store) = ledger();
        ledger.record_like("a").unwrap();
        let before = store.peek(ACTIVITY_KEY);

        assert!(!ledger.remove_like("never-liked").unwrap());
        assert_eq!(store.peek(ACTIVITY_KEY), before);
        assert_eq!(ledger.get_activity().likes(), 1);
    }

    #[test]
    fn counts_follow_sets_through_mixed_sequences() {
        let (ledger, _) = ledger();
        let ops: &[(&str, bool)] = &[
            ("a", true),
            ("b", true),
            ("a", true),
            ("c", false),
            ("a", false),
            ("a", false),
            ("d", true),
        ];
        for (id, add) in ops {
            if *add {
                ledger.record_like(id).unwrap();
            } else {
                ledger.remove_like(id).unwrap();
            }
            let activity = ledger.get_activity();
            assert_eq!(activity.likes(), activity.liked_events().len());
        }
        let activity = ledger.get_activity();
        assert_eq!(activity.likes(), 2);
        assert!(ledger.has_liked("b") && ledger.has_liked("d"));
    }

    #[test]
    fn saves_and_replies_are_tracked_separately() {
        let (ledger, _) = ledger();
        ledger.record_save("p").unwrap();
        ledger.record_reply("p").unwrap();
        ledger.record_reply("p").unwrap();
        assert!(ledger.has_saved("p"));
        assert!(!ledger.has_liked("p"));
        assert!(ledger.has_replied("p"));

        ledger.remove_save("p").unwrap();
        let activity = ledger.get_activity();
        assert_eq!((activity.likes(), activity.saves(), activity.replies()), (0, 0, 1));
    }

    #[test]
    fn failed_write_leaves_record_unchanged() {
        // Room for a one-like record, not for a second id of 128 bytes.
        let store = Arc::new(MemoryStore::with_quota(160));
        let ledger = ActivityLedger::new(store.clone());
        ledger.record_like("a").unwrap();
        let before = ledger.get_activity();
        let raw_before = store.peek(ACTIVITY_KEY);

        let err = ledger.record_like(&"z".repeat(128)).unwrap_err();
        assert!(matches!(err, PorchError::StorageUnavailable(StorageError::QuotaExceeded)));
        assert_eq!(ledger.get_activity(), before);
        assert_eq!(store.peek(ACTIVITY_KEY), raw_before);
        assert_eq!(before.likes(), before.liked_events().len());
    }

    #[test]
    fn unavailable_store_degrades_reads_and_fails_writes() {
        let (ledger, store) = ledger();
        ledger.record_like("a").unwrap();
        store.set_disabled(true);

        assert!(!ledger.has_liked("a"));
        assert_eq!(ledger.get_activity().likes(), 0);
        assert!(ledger.record_like("b").is_err());
    }

    #[test]
    fn corrupt_record_is_replaced_on_write() {
        let (ledger, store) = ledger();
        store.set(ACTIVITY_KEY, "{garbage").unwrap();
        assert_eq!(ledger.get_activity().likes(), 0);

        assert!(ledger.record_like("a").unwrap());
        assert_eq!(ledger.get_activity().likes(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let (ledger, _) = ledger();
        ledger.record_like("a").unwrap();
        ledger.record_save("b").unwrap();
        ledger.clear().unwrap();
        assert_eq!(ledger.get_activity(), ActivityRecord::default());
    }
}
