//! Collaboration service front-door.
//!
//! Starts flows, keeps at most one live controller per target group, and
//! keeps the service status fresh from identity and sync notifications.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use collab_protocol::{
    CollaborationId, DataSharingService, EitherGroupId, GroupData, GroupId, GroupToken,
    IdentityEvent, IdentityManager, MemberRole, MetricsRecorder, PeopleGroupActionOutcome,
    ServiceStatus, ServiceStatusUpdate, SyncEvent, SyncService, TabGroupSyncService,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use url::Url;

use crate::collaborators::Collaborators;
use crate::config::CollaborationConfig;
use crate::controller::{CollaborationController, ControllerHandle, FlowId};
use crate::delegate::CollaborationControllerDelegate;
use crate::flow::Flow;
use crate::metrics::{self, JoinEvent, ShareOrManageEvent};
use crate::status::StatusTracker;
use crate::{CollabError, LOG_TARGET, Result};

/// A flow waiting for conflicting flows to finish.
enum FlowStart {
    Join {
        token: GroupToken,
        delegate: Arc<dyn CollaborationControllerDelegate>,
    },
    ShareOrManage {
        either_id: EitherGroupId,
        delegate: Arc<dyn CollaborationControllerDelegate>,
    },
}

#[derive(Default)]
struct Registries {
    join: HashMap<GroupToken, ControllerHandle>,
    /// Join flows for links that did not parse; never deduplicated.
    invalid_joins: Vec<ControllerHandle>,
    share: HashMap<EitherGroupId, ControllerHandle>,
}

impl Registries {
    fn active(&self) -> Vec<ControllerHandle> {
        self.join
            .values()
            .chain(&self.invalid_joins)
            .chain(self.share.values())
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.join.len() + self.invalid_joins.len() + self.share.len()
    }

    /// The live flow that `start` would duplicate.
    fn duplicate_of(&self, start: &FlowStart) -> Option<&ControllerHandle> {
        match start {
            FlowStart::Join { token, .. } if token.is_valid() => self.join.get(token),
            FlowStart::Join { .. } => None,
            FlowStart::ShareOrManage { either_id, .. } => self.share.get(either_id),
        }
    }
}

struct ServiceInner {
    services: Collaborators,
    flows: Mutex<Registries>,
}

impl ServiceInner {
    /// Promotes the flow `start` duplicates, or exits every active flow and
    /// then starts `start`. Starts synchronously when nothing is active.
    /// Flows started while waiting are exited too, so the latest request
    /// wins.
    fn exit_conflicting_flows(self: &Arc<Self>, start: FlowStart) {
        let active = {
            let mut flows = self.flows.lock();
            if let Some(existing) = flows.duplicate_of(&start) {
                existing.promote_current_session();
                return;
            }
            let active = flows.active();
            if active.is_empty() {
                // Held across the spawn so the finish callback cannot run
                // before the entry exists.
                self.start_flow(&mut flows, start);
                return;
            }
            active
        };

        debug!(target: LOG_TARGET, count = active.len(), "exiting conflicting flows");
        for handle in &active {
            handle.exit();
        }

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            for handle in &active {
                handle.finished().await;
            }
            if let Some(inner) = weak.upgrade() {
                inner.exit_conflicting_flows(start);
            }
        });
    }

    fn start_flow(self: &Arc<Self>, flows: &mut Registries, start: FlowStart) {
        let weak = Arc::downgrade(self);
        match start {
            FlowStart::Join { token, delegate } => {
                let key = token.clone();
                let handle = CollaborationController::spawn(
                    Flow::join(token.clone()),
                    self.services.clone(),
                    delegate,
                    Box::new(move |flow_id| finish_join_flow(&weak, &key, flow_id)),
                );
                info!(target: LOG_TARGET, flow_id = %handle.id(), group_id = %token.group_id, "join flow started");
                if token.is_valid() {
                    flows.join.insert(token, handle);
                } else {
                    flows.invalid_joins.push(handle);
                }
            }
            FlowStart::ShareOrManage {
                either_id,
                delegate,
            } => {
                let handle = CollaborationController::spawn(
                    Flow::share_or_manage(either_id),
                    self.services.clone(),
                    delegate,
                    Box::new(move |flow_id| finish_share_flow(&weak, &either_id, flow_id)),
                );
                info!(target: LOG_TARGET, flow_id = %handle.id(), %either_id, "share or manage flow started");
                flows.share.insert(either_id, handle);
            }
        }
    }

    fn on_collaboration_group_removed(
        &self,
        group_id: &GroupId,
        outcome: PeopleGroupActionOutcome,
    ) -> Result<()> {
        if outcome != PeopleGroupActionOutcome::Success {
            return Err(CollabError::GroupRemovalFailed {
                group_id: group_id.clone(),
                outcome,
            });
        }
        self.services
            .tab_group_sync
            .on_collaboration_removed(&CollaborationId::from(group_id));
        Ok(())
    }
}

fn finish_join_flow(inner: &Weak<ServiceInner>, token: &GroupToken, flow_id: FlowId) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut flows = inner.flows.lock();
    if !token.is_valid() {
        flows.invalid_joins.retain(|handle| handle.id() != flow_id);
        debug!(target: LOG_TARGET, %flow_id, "join flow removed");
        return;
    }
    // A newer flow may own the key by now.
    if flows.join.get(token).is_some_and(|handle| handle.id() == flow_id) {
        flows.join.remove(token);
        debug!(target: LOG_TARGET, %flow_id, "join flow removed");
    }
}

fn finish_share_flow(inner: &Weak<ServiceInner>, either_id: &EitherGroupId, flow_id: FlowId) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut flows = inner.flows.lock();
    if flows
        .share
        .get(either_id)
        .is_some_and(|handle| handle.id() == flow_id)
    {
        flows.share.remove(either_id);
        debug!(target: LOG_TARGET, %flow_id, "share or manage flow removed");
    }
}

/// Front-door for collaboration flows.
pub struct CollaborationService {
    inner: Arc<ServiceInner>,
    _status_relay: DropGuard,
}

impl CollaborationService {
    /// Creates the service and starts relaying identity and sync
    /// notifications into the status tracker. Must be called inside a tokio
    /// runtime.
    pub fn new(
        config: CollaborationConfig,
        data_sharing: Arc<dyn DataSharingService>,
        tab_group_sync: Arc<dyn TabGroupSyncService>,
        identity: Arc<dyn IdentityManager>,
        sync: Arc<dyn SyncService>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        let status = Arc::new(StatusTracker::new(
            Arc::clone(&identity),
            Arc::clone(&sync),
            config.features,
        ));

        let relay_token = CancellationToken::new();
        tokio::spawn(relay_status_inputs(
            Arc::clone(&status),
            identity.subscribe(),
            sync.subscribe(),
            relay_token.clone(),
        ));

        let services = Collaborators {
            status,
            data_sharing,
            tab_group_sync,
            identity,
            metrics,
            timeouts: config.timeouts,
        };

        Self {
            inner: Arc::new(ServiceInner {
                services,
                flows: Mutex::new(Registries::default()),
            }),
            _status_relay: relay_token.drop_guard(),
        }
    }

    /// Starts a join flow from an invitation link. An unparseable link
    /// starts a flow with an empty token, which fails with `InvalidUrl`.
    pub fn start_join_flow(
        &self,
        delegate: Arc<dyn CollaborationControllerDelegate>,
        url: &Url,
    ) {
        let token = match self.inner.services.data_sharing.parse_data_sharing_url(url) {
            Ok(token) if token.is_valid() => token,
            Ok(_) => GroupToken::default(),
            Err(err) => {
                debug!(target: LOG_TARGET, %err, "invitation link not parsed");
                GroupToken::default()
            }
        };

        if token.is_valid() {
            if let Some(existing) = self.inner.flows.lock().join.get(&token) {
                existing.promote_current_session();
                return;
            }
        }

        metrics::record_join_event(self.inner.services.metrics.as_ref(), JoinEvent::Started);
        self.inner
            .exit_conflicting_flows(FlowStart::Join { token, delegate });
    }

    /// Starts a share or manage flow for a local tab group, or promotes the
    /// one already running for it.
    pub fn start_share_or_manage_flow(
        &self,
        delegate: Arc<dyn CollaborationControllerDelegate>,
        either_id: EitherGroupId,
    ) {
        if let Some(existing) = self.inner.flows.lock().share.get(&either_id) {
            existing.promote_current_session();
            return;
        }

        metrics::record_share_or_manage_event(
            self.inner.services.metrics.as_ref(),
            ShareOrManageEvent::Started,
        );
        self.inner
            .exit_conflicting_flows(FlowStart::ShareOrManage {
                either_id,
                delegate,
            });
    }

    pub fn service_status(&self) -> ServiceStatus {
        self.inner.services.status.service_status()
    }

    /// Notified whenever the service status changes value.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ServiceStatusUpdate> {
        self.inner.services.status.subscribe()
    }

    pub fn current_user_role_for_group(&self, group_id: &GroupId) -> MemberRole {
        self.inner.services.current_user_role_for_group(group_id)
    }

    pub fn group_data(&self, group_id: &GroupId) -> Option<GroupData> {
        self.inner.services.group_data(group_id)
    }

    /// Deletes the people group; the tab group sync store is told on
    /// success.
    pub async fn delete_group(&self, group_id: &GroupId) -> Result<()> {
        let outcome = self.inner.services.data_sharing.delete_group(group_id).await;
        self.inner.on_collaboration_group_removed(group_id, outcome)
    }

    /// Leaves the people group; the tab group sync store is told on
    /// success.
    pub async fn leave_group(&self, group_id: &GroupId) -> Result<()> {
        let outcome = self.inner.services.data_sharing.leave_group(group_id).await;
        self.inner.on_collaboration_group_removed(group_id, outcome)
    }

    /// The live join flow for `token`. For an invalid token, the most
    /// recently started flow for an unparseable link.
    pub fn join_flow(&self, token: &GroupToken) -> Option<ControllerHandle> {
        let flows = self.inner.flows.lock();
        if token.is_valid() {
            flows.join.get(token).cloned()
        } else {
            flows.invalid_joins.last().cloned()
        }
    }

    pub fn share_flow(&self, either_id: &EitherGroupId) -> Option<ControllerHandle> {
        self.inner.flows.lock().share.get(either_id).cloned()
    }

    pub fn active_flow_count(&self) -> usize {
        self.inner.flows.lock().len()
    }
}

impl Drop for CollaborationService {
    fn drop(&mut self) {
        for handle in self.inner.flows.lock().active() {
            handle.exit();
        }
    }
}

/// Refreshes the status on identity and sync notifications until both
/// sources shut down or the service is dropped.
async fn relay_status_inputs(
    status: Arc<StatusTracker>,
    mut identity_rx: broadcast::Receiver<IdentityEvent>,
    mut sync_rx: broadcast::Receiver<SyncEvent>,
    token: CancellationToken,
) {
    let mut identity_open = true;
    let mut sync_open = true;

    while identity_open || sync_open {
        tokio::select! {
            _ = token.cancelled() => break,
            event = identity_rx.recv(), if identity_open => match event {
                Ok(IdentityEvent::Shutdown) | Err(RecvError::Closed) => identity_open = false,
                Ok(_) => {
                    status.refresh();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: LOG_TARGET, skipped, "identity notifications lagged");
                    status.refresh();
                }
            },
            event = sync_rx.recv(), if sync_open => match event {
                Ok(SyncEvent::Shutdown) | Err(RecvError::Closed) => sync_open = false,
                Ok(SyncEvent::StateChanged) => {
                    status.refresh();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: LOG_TARGET, skipped, "sync notifications lagged");
                    status.refresh();
                }
            },
        }
    }
}
