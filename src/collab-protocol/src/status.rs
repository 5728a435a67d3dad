//! Eligibility snapshot gating every collaboration flow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sign-in state of the primary account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SigninStatus {
    #[default]
    NotSignedIn,
    /// A primary account exists but its credentials need attention.
    SignedInPaused,
    SignedIn,
}

/// Whether tab groups are synced for the primary account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    NotSyncing,
    /// Sync is on but the tab group data type is not selected.
    SyncWithoutTabGroup,
    SyncEnabled,
}

/// Availability of the collaboration feature itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    #[default]
    Disabled,
    /// Account policy is still being resolved.
    DisabledPending,
    DisabledForPolicy,
    AllowedToJoin,
    EnabledJoinOnly,
    EnabledCreateAndJoin,
}

/// Composite status snapshot read by flow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ServiceStatus {
    pub signin_status: SigninStatus,
    pub sync_status: SyncStatus,
    pub collaboration_status: CollaborationStatus,
}

impl ServiceStatus {
    /// Whether the feature allows joining an existing group.
    pub fn is_allowed_to_join(&self) -> bool {
        match self.collaboration_status {
            CollaborationStatus::Disabled
            | CollaborationStatus::DisabledPending
            | CollaborationStatus::DisabledForPolicy => false,
            CollaborationStatus::AllowedToJoin
            | CollaborationStatus::EnabledJoinOnly
            | CollaborationStatus::EnabledCreateAndJoin => true,
        }
    }

    /// Whether the feature allows creating (sharing) a new group.
    pub fn is_allowed_to_create(&self) -> bool {
        self.collaboration_status == CollaborationStatus::EnabledCreateAndJoin
    }

    /// Signed in and syncing tab groups.
    pub fn is_authentication_valid(&self) -> bool {
        self.signin_status == SigninStatus::SignedIn && self.sync_status == SyncStatus::SyncEnabled
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signin={:?} sync={:?} collaboration={:?}",
            self.signin_status, self.sync_status, self.collaboration_status
        )
    }
}

/// Change notification pushed to status observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusUpdate {
    pub old_status: ServiceStatus,
    pub new_status: ServiceStatus,
}
