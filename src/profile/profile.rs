use serde::{Deserialize, Serialize};

use super::signals::SignalLists;
use crate::types::identifiers::{ProfileVersion, UserId};

/// Snapshot of the parts of a user record the feed engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    /// Public identifier recorded in per-post view counts.
    pub secondary_id: String,
    #[serde(default)]
    pub followed_creator_ids: Vec<UserId>,
    #[serde(default)]
    pub signals: SignalLists,
}

impl UserProfile {
    pub fn new(id: UserId, secondary_id: impl Into<String>, signals: SignalLists) -> Self {
        Self {
            id,
            secondary_id: secondary_id.into(),
            followed_creator_ids: Vec::new(),
            signals,
        }
    }

    /// Profile of a freshly created account.
    pub fn new_user(id: UserId, secondary_id: impl Into<String>) -> Self {
        Self::new(id, secondary_id, SignalLists::new_user_defaults())
    }

    pub fn with_following(mut self, creators: impl IntoIterator<Item = UserId>) -> Self {
        self.followed_creator_ids = creators.into_iter().collect();
        self
    }

    /// Content hash over the sampling-relevant fields.
    ///
    /// One line per fact, in a fixed order, so equal snapshots always hash
    /// equal regardless of how they were deserialized.
    pub fn version(&self) -> ProfileVersion {
        let mut canonical = String::new();
        canonical.push_str(&format!("id:{}\n", self.id.as_str()));
        canonical.push_str(&format!("secondary:{}\n", self.secondary_id));
        for creator in &self.followed_creator_ids {
            canonical.push_str(&format!("follows:{}\n", creator.as_str()));
        }
        for (kind, entries) in self.signals.iter() {
            for entry in entries {
                canonical.push_str(&format!("{kind:?}:{}:{}\n", entry.label, entry.value));
            }
        }

        ProfileVersion::from_content(canonical.as_bytes())
    }
}
