//! Tab group records held by the tab group sync store.

use serde::{Deserialize, Serialize};

use crate::ids::{CollaborationId, EitherGroupId, GroupId, LocalTabGroupId, SyncGroupId};

/// A saved tab group as seen by the sync store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTabGroup {
    pub sync_id: SyncGroupId,
    /// Present when the group is open in a local window.
    pub local_group_id: Option<LocalTabGroupId>,
    /// Present once the group has been migrated to a shared group.
    pub collaboration_id: Option<CollaborationId>,
    pub title: String,
}

impl SavedTabGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            sync_id: SyncGroupId::new(),
            local_group_id: None,
            collaboration_id: None,
            title: title.into(),
        }
    }

    pub fn with_local_id(mut self, local_group_id: LocalTabGroupId) -> Self {
        self.local_group_id = Some(local_group_id);
        self
    }

    pub fn with_collaboration_id(mut self, collaboration_id: CollaborationId) -> Self {
        self.collaboration_id = Some(collaboration_id);
        self
    }

    pub fn is_shared_tab_group(&self) -> bool {
        self.collaboration_id.is_some()
    }

    /// Whether this group is the shared counterpart of `group_id`.
    pub fn is_shared_with(&self, group_id: &GroupId) -> bool {
        self.collaboration_id
            .as_ref()
            .is_some_and(|id| id == group_id)
    }

    pub fn matches(&self, id: &EitherGroupId) -> bool {
        match id {
            EitherGroupId::Local(local) => self.local_group_id.as_ref() == Some(local),
            EitherGroupId::Sync(sync) => &self.sync_id == sync,
        }
    }
}

/// Origin of a tab group change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Local,
    Remote,
}

/// Result of migrating a local tab group to a shared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabGroupSharingResult {
    Success,
    Failure,
}
