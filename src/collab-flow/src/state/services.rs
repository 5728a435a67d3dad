//! Backend readiness and flow requirement checks.

use collab_protocol::{DataSharingEvent, ErrorInfo, FlowType, TabGroupSyncEvent};

use super::{ControllerState, Next, StateContext, StateEvent, StateId, Subscription, TimeoutReason};
use crate::metrics::{JoinEvent, ShareOrManageEvent};

/// Waits until both the people group store and the tab group sync store
/// are ready, in either order.
#[derive(Default)]
pub(crate) struct WaitingForServicesToInitializeState {
    is_tab_group_sync_ready: bool,
    is_data_sharing_ready: bool,
    timeout: Option<Subscription>,
    tab_group_sync_observer: Option<Subscription>,
    data_sharing_observer: Option<Subscription>,
}

impl WaitingForServicesToInitializeState {
    fn on_tab_group_sync_initialized(&mut self, cx: &mut StateContext<'_>) -> Next {
        if self.is_tab_group_sync_ready {
            return Next::Stay;
        }
        cx.record_for_flow(
            JoinEvent::TabGroupServiceReady,
            ShareOrManageEvent::TabGroupServiceReady,
        );
        self.is_tab_group_sync_ready = true;
        self.tab_group_sync_observer = None;
        self.maybe_proceed(cx)
    }

    fn on_group_data_model_loaded(&mut self, cx: &mut StateContext<'_>) -> Next {
        if self.is_data_sharing_ready {
            return Next::Stay;
        }
        cx.record_for_flow(
            JoinEvent::DataSharingServiceReadyObserved,
            ShareOrManageEvent::DataSharingServiceReadyObserved,
        );
        self.is_data_sharing_ready = true;
        self.data_sharing_observer = None;
        self.maybe_proceed(cx)
    }

    fn maybe_proceed(&mut self, cx: &mut StateContext<'_>) -> Next {
        if !(self.is_tab_group_sync_ready && self.is_data_sharing_ready) {
            return Next::Stay;
        }
        cx.record_for_flow(
            JoinEvent::AllServicesReadyForFlow,
            ShareOrManageEvent::AllServicesReadyForFlow,
        );
        self.on_processing_finished_with_success(cx)
    }
}

impl ControllerState for WaitingForServicesToInitializeState {
    fn id(&self) -> StateId {
        StateId::WaitingForServicesToInitialize
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        let timeout = cx.services.timeouts.services_ready();
        self.timeout = Some(cx.post_delayed(TimeoutReason::ServicesReady, timeout));

        self.tab_group_sync_observer = Some(cx.observe_tab_group_sync());

        let data_sharing_observer = cx.observe_data_sharing();
        if cx.services.data_sharing.is_group_data_model_loaded() {
            cx.record_for_flow(
                JoinEvent::DataSharingReadyWhenStarted,
                ShareOrManageEvent::DataSharingReadyWhenStarted,
            );
            self.is_data_sharing_ready = true;
        } else {
            self.data_sharing_observer = Some(data_sharing_observer);
        }

        // The store may have finished initializing before we subscribed.
        if cx.services.tab_group_sync.is_initialized() {
            return self.on_tab_group_sync_initialized(cx);
        }
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::to(StateId::CheckingFlowRequirements)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::TabGroupSync(TabGroupSyncEvent::Initialized) => {
                self.on_tab_group_sync_initialized(cx)
            }
            StateEvent::DataSharing(DataSharingEvent::GroupDataModelLoaded) => {
                self.on_group_data_model_loaded(cx)
            }
            StateEvent::Timeout(TimeoutReason::ServicesReady) => {
                cx.record_for_flow(
                    JoinEvent::TimeoutWaitingForServicesReady,
                    ShareOrManageEvent::TimeoutWaitingForServicesReady,
                );
                self.handle_error(cx)
                    .with_detail("services not ready in time")
            }
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            _ => Next::Stay,
        }
    }

    fn on_exit(&mut self, _cx: &mut StateContext<'_>) {
        self.timeout = None;
        self.tab_group_sync_observer = None;
        self.data_sharing_observer = None;
    }
}

/// Decides where the flow goes once the backends are ready.
pub(crate) struct CheckingFlowRequirementsState;

impl CheckingFlowRequirementsState {
    fn enter_join(&mut self, cx: &mut StateContext<'_>) -> Next {
        cx.record_join(JoinEvent::FlowRequirementsMet);

        let token = cx.flow.join_token().clone();
        let group_id = &token.group_id;
        if cx.services.is_people_group_in_data_sharing(group_id) {
            if cx.services.is_tab_group_in_sync(group_id) {
                cx.record_join(JoinEvent::OpenedExistingGroup);
                return Next::to(StateId::OpeningLocalTabGroup);
            }
            cx.record_join(JoinEvent::FoundCollaborationWithoutTabGroup);
            return Next::to(StateId::WaitingForSyncAndDataSharingGroup);
        }

        // Not a member yet: read the group first to validate the invitation.
        let data_sharing = cx.services.data_sharing.clone();
        cx.spawn(
            async move { data_sharing.read_new_group(&token).await },
            StateEvent::NewGroupRead,
        );
        Next::Stay
    }

    fn enter_share_or_manage(&mut self, cx: &mut StateContext<'_>) -> Next {
        cx.record_share(ShareOrManageEvent::FlowRequirementsMet);

        let Some(group) = cx.services.tab_group_sync.get_group(&cx.flow.either_id()) else {
            cx.record_share(ShareOrManageEvent::SyncedTabGroupNotFound);
            return self.handle_error(cx).with_detail("tab group not found");
        };

        if group.is_shared_tab_group() {
            Next::to(StateId::ShowingManageScreen)
        } else {
            Next::to(StateId::ShowingShareScreen)
        }
    }
}

impl ControllerState for CheckingFlowRequirementsState {
    fn id(&self) -> StateId {
        StateId::CheckingFlowRequirements
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        match cx.flow.flow_type() {
            FlowType::Join => self.enter_join(cx),
            FlowType::ShareOrManage => self.enter_share_or_manage(cx),
        }
    }

    fn on_processing_finished_with_success(&mut self, cx: &mut StateContext<'_>) -> Next {
        assert_eq!(cx.flow.flow_type(), FlowType::Join);
        Next::to(StateId::AddingUserToGroup)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::NewGroupRead(result) => {
                // The preview step reports unusable invitations; a failed
                // read is only metered.
                match result {
                    Ok(_) => cx.record_join(JoinEvent::ReadNewGroupSuccess),
                    Err(_) => cx.record_join(JoinEvent::ReadNewGroupFailed),
                }
                self.on_processing_finished_with_success(cx)
            }
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            _ => Next::Stay,
        }
    }
}
