//! Boundaries of the services a collaboration flow coordinates.
//!
//! Implementations live outside this workspace. Every service exposes its
//! notifications as a [`broadcast`] channel; subscribing is synchronous, so
//! a caller that subscribes before checking a readiness flag cannot miss
//! the notification that flips it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use url::Url;

use crate::account::{AccountInfo, ManagedStatus, UserSelectableType};
use crate::group::{
    DataPreviewActionFailure, GroupData, ParseUrlError, PeopleGroupActionFailure,
    PeopleGroupActionOutcome, SharedDataPreview,
};
use crate::ids::{CollaborationId, EitherGroupId, GroupId, GroupToken, LocalTabGroupId, SyncGroupId};
use crate::tab_group::{SavedTabGroup, TabGroupSharingResult, TriggerSource};

// ============================================================================
// People group store
// ============================================================================

/// Notifications from the people group store.
#[derive(Debug, Clone)]
pub enum DataSharingEvent {
    /// The local cache of people groups finished loading.
    GroupDataModelLoaded,
    GroupAdded {
        group: GroupData,
        event_time: DateTime<Utc>,
    },
    GroupChanged {
        group: GroupData,
        event_time: DateTime<Utc>,
    },
    GroupRemoved {
        group_id: GroupId,
        event_time: DateTime<Utc>,
    },
}

/// People group (membership) store.
#[async_trait]
pub trait DataSharingService: Send + Sync {
    fn is_group_data_model_loaded(&self) -> bool;

    /// Cached read; `None` if the group is not known locally.
    fn read_group(&self, group_id: &GroupId) -> Option<GroupData>;

    /// Network read of a group the user is not a member of yet.
    async fn read_new_group(&self, token: &GroupToken)
    -> Result<GroupData, PeopleGroupActionFailure>;

    /// Network read that also refreshes the local cache.
    async fn read_group_deprecated(
        &self,
        group_id: &GroupId,
    ) -> Result<GroupData, PeopleGroupActionFailure>;

    async fn get_shared_entities_preview(
        &self,
        token: &GroupToken,
    ) -> Result<SharedDataPreview, DataPreviewActionFailure>;

    async fn delete_group(&self, group_id: &GroupId) -> PeopleGroupActionOutcome;

    async fn leave_group(&self, group_id: &GroupId) -> PeopleGroupActionOutcome;

    fn parse_data_sharing_url(&self, url: &Url) -> Result<GroupToken, ParseUrlError>;

    /// Invitation link for `group`; `None` if one cannot be built.
    fn get_data_sharing_url(&self, group: &GroupData) -> Option<Url>;

    fn subscribe(&self) -> broadcast::Receiver<DataSharingEvent>;
}

// ============================================================================
// Tab group sync store
// ============================================================================

/// Notifications from the tab group sync store.
#[derive(Debug, Clone)]
pub enum TabGroupSyncEvent {
    Initialized,
    TabGroupAdded {
        group: SavedTabGroup,
        source: TriggerSource,
    },
    TabGroupUpdated {
        group: SavedTabGroup,
        source: TriggerSource,
    },
    TabGroupRemoved {
        sync_id: SyncGroupId,
        source: TriggerSource,
    },
}

/// Local-to-cloud store of saved tab groups.
#[async_trait]
pub trait TabGroupSyncService: Send + Sync {
    fn is_initialized(&self) -> bool;

    fn get_all_groups(&self) -> Vec<SavedTabGroup>;

    fn get_group(&self, id: &EitherGroupId) -> Option<SavedTabGroup>;

    /// Migrates a local group to its shared representation.
    async fn make_tab_group_shared(
        &self,
        local_group_id: LocalTabGroupId,
        collaboration_id: CollaborationId,
    ) -> TabGroupSharingResult;

    /// Called after the people group behind `collaboration_id` is gone.
    fn on_collaboration_removed(&self, collaboration_id: &CollaborationId);

    fn subscribe(&self) -> broadcast::Receiver<TabGroupSyncEvent>;
}

// ============================================================================
// Identity and sync
// ============================================================================

/// Notifications from the identity manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    PrimaryAccountChanged,
    RefreshTokenUpdated { account_id: String },
    RefreshTokenRemoved { account_id: String },
    /// A pending managed status lookup finished.
    AccountManagedStatusResolved,
    Shutdown,
}

/// Source of primary account state.
pub trait IdentityManager: Send + Sync {
    fn primary_account(&self) -> Option<AccountInfo>;

    fn has_primary_account_with_refresh_token(&self) -> bool;

    /// Whether the primary account's refresh token is in a persistent
    /// error state (e.g. revoked credentials).
    fn is_primary_account_in_persistent_error(&self) -> bool;

    /// Managed status of `account`. Returns [`ManagedStatus::Pending`]
    /// and later emits [`IdentityEvent::AccountManagedStatusResolved`]
    /// while a lookup is in flight.
    fn account_managed_status(&self, account: &AccountInfo) -> ManagedStatus;

    fn subscribe(&self) -> broadcast::Receiver<IdentityEvent>;
}

/// Notifications from the sync service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    StateChanged,
    Shutdown,
}

/// Sync engine settings.
pub trait SyncService: Send + Sync {
    fn selected_types(&self) -> Vec<UserSelectableType>;

    fn is_sync_feature_enabled(&self) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<SyncEvent>;
}

// ============================================================================
// Metrics
// ============================================================================

/// Sink for enumerated histogram samples.
pub trait MetricsRecorder: Send + Sync {
    fn record_enumeration(&self, histogram: &'static str, sample: u32, exclusive_max: u32);
}
