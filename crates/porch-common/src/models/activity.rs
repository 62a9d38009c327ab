//! Activity record: what the current identity has liked, saved, or replied to.
//!
//! The three counts are always the cardinality of their sets. They are written
//! out for readers of the stored JSON but ignored when reading it back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which set an activity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Like,
    Save,
    Reply,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredActivity", into = "StoredActivity")]
pub struct ActivityRecord {
    liked_events: BTreeSet<String>,
    saved_events: BTreeSet<String>,
    reply_events: BTreeSet<String>,
}

impl ActivityRecord {
    pub fn likes(&self) -> usize {
        self.liked_events.len()
    }

    pub fn saves(&self) -> usize {
        self.saved_events.len()
    }

    pub fn replies(&self) -> usize {
        self.reply_events.len()
    }

    pub fn liked_events(&self) -> &BTreeSet<String> {
        &self.liked_events
    }

    pub fn saved_events(&self) -> &BTreeSet<String> {
        &self.saved_events
    }

    pub fn reply_events(&self) -> &BTreeSet<String> {
        &self.reply_events
    }

    pub fn contains(&self, kind: ActivityKind, content_id: &str) -> bool {
        self.set(kind).contains(content_id)
    }

    /// Add `content_id` to the set for `kind`. Returns `false` if it was already there.
    pub fn insert(&mut self, kind: ActivityKind, content_id: &str) -> bool {
        self.set_mut(kind).insert(content_id.to_owned())
    }

    /// Remove `content_id` from the set for `kind`. Returns `false` if it was absent.
    pub fn remove(&mut self, kind: ActivityKind, content_id: &str) -> bool {
        self.set_mut(kind).remove(content_id)
    }

    fn set(&self, kind: ActivityKind) -> &BTreeSet<String> {
        match kind {
            ActivityKind::Like => &self.liked_events,
            ActivityKind::Save => &self.saved_events,
            ActivityKind::Reply => &self.reply_events,
        }
    }

    fn set_mut(&mut self, kind: ActivityKind) -> &mut BTreeSet<String> {
        match kind {
            ActivityKind::Like => &mut self.liked_events,
            ActivityKind::Save => &mut self.saved_events,
            ActivityKind::Reply => &mut self.reply_events,
        }
    }
}

// ─── Wire shape ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct StoredActivity {
    liked_events: BTreeSet<String>,
    saved_events: BTreeSet<String>,
    reply_events: BTreeSet<String>,
    likes: usize,
    saves: usize,
    replies: usize,
}

impl From<StoredActivity> for ActivityRecord {
    fn from(stored: StoredActivity) -> Self {
        // Stored counts are informational; the sets are the truth.
        Self {
            liked_events: stored.liked_events,
            saved_events: stored.saved_events,
            reply_events: stored.reply_events,
        }
    }
}

impl From<ActivityRecord> for StoredActivity {
    fn from(record: ActivityRecord) -> Self {
        Self {
            likes: record.likes(),
            saves: record.saves(),
            replies: record.replies(),
            liked_events: record.liked_events,
            saved_events: record.saved_events,
            reply_events: record.reply_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drifted_counts_are_recomputed_on_load() {
        let json = r#"{"likedEvents":["a","b"],"savedEvents":[],"replyEvents":["c"],
                       "likes":7,"saves":3,"replies":0}"#;
        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.likes(), 2);
        assert_eq!(record.saves(), 0);
        assert_eq!(record.replies(), 1);
    }

    #[test]
    fn serialized_form_carries_counts() {
        let mut record = ActivityRecord::default();
        record.insert(ActivityKind::Like, "a");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["likes"], 1);
        assert_eq!(json["likedEvents"][0], "a");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let record: ActivityRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, ActivityRecord::default());
    }
}
