//! Service status tracking.
//!
//! The tracker owns the cached `{signin, sync, collaboration}` snapshot.
//! Subscribers are only woken when a refresh actually changes the value.

use std::sync::Arc;

use collab_protocol::{
    CollaborationStatus, IdentityManager, ManagedStatus, ServiceStatus, ServiceStatusUpdate,
    SigninStatus, SyncService, SyncStatus, may_be_enterprise_user_based_on_email,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::LOG_TARGET;
use crate::config::FeatureConfig;

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Computes and caches the service status.
pub struct StatusTracker {
    identity: Arc<dyn IdentityManager>,
    sync: Arc<dyn SyncService>,
    features: FeatureConfig,
    current: Mutex<ServiceStatus>,
    tx: broadcast::Sender<ServiceStatusUpdate>,
}

impl StatusTracker {
    pub fn new(
        identity: Arc<dyn IdentityManager>,
        sync: Arc<dyn SyncService>,
        features: FeatureConfig,
    ) -> Self {
        let (tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let tracker = Self {
            identity,
            sync,
            features,
            current: Mutex::new(ServiceStatus::default()),
            tx,
        };
        *tracker.current.lock() = tracker.compute();
        tracker
    }

    /// Last computed status.
    pub fn service_status(&self) -> ServiceStatus {
        *self.current.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceStatusUpdate> {
        self.tx.subscribe()
    }

    /// Recomputes the status and notifies subscribers if it changed.
    /// Returns whether it changed.
    pub fn refresh(&self) -> bool {
        let new_status = self.compute();
        let old_status = {
            let mut current = self.current.lock();
            if *current == new_status {
                return false;
            }
            std::mem::replace(&mut *current, new_status)
        };

        debug!(target: LOG_TARGET, %old_status, %new_status, "service status changed");
        // No receivers is fine: nothing is waiting on the status.
        let _ = self.tx.send(ServiceStatusUpdate {
            old_status,
            new_status,
        });
        true
    }

    fn compute(&self) -> ServiceStatus {
        let signin_status = self.signin_status();
        ServiceStatus {
            signin_status,
            sync_status: self.sync_status(),
            collaboration_status: self.collaboration_status(signin_status),
        }
    }

    fn signin_status(&self) -> SigninStatus {
        if self.identity.has_primary_account_with_refresh_token()
            && !self.identity.is_primary_account_in_persistent_error()
        {
            SigninStatus::SignedIn
        } else if self.identity.primary_account().is_some() {
            SigninStatus::SignedInPaused
        } else {
            SigninStatus::NotSignedIn
        }
    }

    fn sync_status(&self) -> SyncStatus {
        if self
            .sync
            .selected_types()
            .contains(&self.features.required_sync_type)
        {
            SyncStatus::SyncEnabled
        } else if self.sync.is_sync_feature_enabled()
            || self.features.replace_sync_promos_with_signin_promos
        {
            SyncStatus::SyncWithoutTabGroup
        } else {
            SyncStatus::NotSyncing
        }
    }

    fn collaboration_status(&self, signin_status: SigninStatus) -> CollaborationStatus {
        if !self.features.signin_allowed {
            return CollaborationStatus::DisabledForPolicy;
        }

        let status = if self.features.data_sharing {
            CollaborationStatus::EnabledCreateAndJoin
        } else if self.features.join_only {
            CollaborationStatus::AllowedToJoin
        } else {
            CollaborationStatus::Disabled
        };

        if signin_status == SigninStatus::NotSignedIn {
            return status;
        }
        let Some(account) = self.identity.primary_account() else {
            return status;
        };
        if !may_be_enterprise_user_based_on_email(&account.email) {
            return status;
        }

        match self.identity.account_managed_status(&account) {
            ManagedStatus::Pending => CollaborationStatus::DisabledPending,
            ManagedStatus::Error | ManagedStatus::Timeout => CollaborationStatus::Disabled,
            ManagedStatus::EnterpriseGoogleDotCom | ManagedStatus::Enterprise => {
                CollaborationStatus::DisabledForPolicy
            }
            ManagedStatus::ConsumerGmail
            | ManagedStatus::ConsumerWellKnown
            | ManagedStatus::ConsumerNotWellKnown => status,
        }
    }
}
