//! Join flow states.

use collab_protocol::{
    DataPreviewActionFailure, DataSharingEvent, ErrorInfo, ErrorType, FlowType, Outcome,
    TabGroupSyncEvent,
};

use super::{
    ControllerState, Next, StateContext, StateEvent, StateId, Subscription, TimeoutReason,
    base_process_outcome,
};
use crate::metrics::JoinEvent;

/// Fetches the invitation preview and asks the user to accept it.
pub(crate) struct AddingUserToGroupState;

impl ControllerState for AddingUserToGroupState {
    fn id(&self) -> StateId {
        StateId::AddingUserToGroup
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        let token = cx.flow.join_token().clone();
        let data_sharing = cx.services.data_sharing.clone();
        cx.spawn(
            async move { data_sharing.get_shared_entities_preview(&token).await },
            StateEvent::PreviewFetched,
        );
        Next::Stay
    }

    fn process_outcome(&mut self, cx: &mut StateContext<'_>, outcome: Outcome) -> Next {
        assert_eq!(
            cx.flow.flow_type(),
            FlowType::Join,
            "only the join flow adds the user to a group"
        );
        match outcome {
            Outcome::Cancel => cx.record_join(JoinEvent::Canceled),
            Outcome::Success => cx.record_join(JoinEvent::AddedUserToGroup),
            Outcome::Failure => {}
        }
        base_process_outcome(self, cx, outcome)
    }

    fn on_processing_finished_with_success(&mut self, cx: &mut StateContext<'_>) -> Next {
        cx.record_join(JoinEvent::Accepted);

        let group_id = &cx.flow.join_token().group_id;
        // Another client may have completed the join already.
        if cx.services.is_tab_group_in_sync(group_id)
            && cx.services.is_people_group_in_data_sharing(group_id)
        {
            cx.record_join(JoinEvent::GroupExistsWhenJoined);
            return Next::to(StateId::OpeningLocalTabGroup);
        }

        cx.record_join(JoinEvent::OpenedNewGroup);
        Next::to(StateId::WaitingForSyncAndDataSharingGroup)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::PreviewFetched(Err(DataPreviewActionFailure::GroupFull)) => {
                cx.record_join(JoinEvent::PreviewGroupFullError);
                self.handle_error(cx).with_detail("group is full")
            }
            StateEvent::PreviewFetched(Ok(preview))
                if preview.shared_tab_group_preview.is_some() =>
            {
                cx.record_join(JoinEvent::PreviewSuccess);
                let delegate = cx.delegate();
                let token = cx.flow.join_token().clone();
                cx.spawn(
                    async move { delegate.show_join_dialog(token, preview).await },
                    StateEvent::Outcome,
                );
                Next::Stay
            }
            StateEvent::PreviewFetched(result) => {
                cx.record_join(JoinEvent::PreviewFailure);
                let detail = match result {
                    Err(failure) => format!("preview failed: {failure}"),
                    Ok(_) => "preview has no shared tab group".to_string(),
                };
                Next::error(ErrorType::InvalidUrl).with_detail(detail)
            }
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            _ => Next::Stay,
        }
    }
}

/// Waits until both the shared tab group and the people group of the joined
/// group are visible locally.
#[derive(Default)]
pub(crate) struct WaitingForSyncAndDataSharingGroupState {
    timeout: Option<Subscription>,
    tab_group_sync_observer: Option<Subscription>,
    data_sharing_observer: Option<Subscription>,
}

impl ControllerState for WaitingForSyncAndDataSharingGroupState {
    fn id(&self) -> StateId {
        StateId::WaitingForSyncAndDataSharingGroup
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        let timeout = cx.services.timeouts.sync_and_people_group();
        self.timeout = Some(cx.post_delayed(TimeoutReason::SyncAndPeopleGroup, timeout));
        self.tab_group_sync_observer = Some(cx.observe_tab_group_sync());
        self.data_sharing_observer = Some(cx.observe_data_sharing());

        let group_id = cx.flow.join_token().group_id.clone();
        let tab_group_exists = cx.services.is_tab_group_in_sync(&group_id);
        let people_group_exists = cx.services.is_people_group_in_data_sharing(&group_id);
        assert!(
            !(tab_group_exists && people_group_exists),
            "join of {group_id} is already complete"
        );

        if !people_group_exists {
            // Forces the people group store to refresh; the result arrives
            // as a group added notification.
            let data_sharing = cx.services.data_sharing.clone();
            cx.spawn_detached(async move { data_sharing.read_group_deprecated(&group_id).await });
        }
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::to(StateId::OpeningLocalTabGroup)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        let group_id = cx.flow.join_token().group_id.clone();
        match event {
            StateEvent::TabGroupSync(
                TabGroupSyncEvent::TabGroupAdded { group, .. }
                | TabGroupSyncEvent::TabGroupUpdated { group, .. },
            ) => {
                if group.is_shared_with(&group_id)
                    && cx.services.is_people_group_in_data_sharing(&group_id)
                {
                    cx.record_join(JoinEvent::TabGroupFetched);
                    return self.process_outcome(cx, Outcome::Success);
                }
                Next::Stay
            }
            StateEvent::DataSharing(
                DataSharingEvent::GroupAdded { group, .. }
                | DataSharingEvent::GroupChanged { group, .. },
            ) => {
                if group.group_token.group_id == group_id
                    && cx.services.is_tab_group_in_sync(&group_id)
                {
                    cx.record_join(JoinEvent::PeopleGroupFetched);
                    return self.process_outcome(cx, Outcome::Success);
                }
                Next::Stay
            }
            StateEvent::Timeout(TimeoutReason::SyncAndPeopleGroup) => {
                // Whatever half already landed stays; a later flow for the
                // same token picks it up in CheckingFlowRequirements.
                cx.record_join(JoinEvent::TimeoutWaitingForSyncAndDataSharingGroup);
                self.handle_error(cx)
                    .with_detail("joined group did not sync down in time")
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

/// Brings the joined tab group to the foreground. Terminal for joins.
pub(crate) struct OpeningLocalTabGroupState;

impl ControllerState for OpeningLocalTabGroupState {
    fn id(&self) -> StateId {
        StateId::OpeningLocalTabGroup
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        assert_eq!(cx.flow.flow_type(), FlowType::Join);

        cx.record_join(JoinEvent::PromoteTabGroup);
        let delegate = cx.delegate();
        let group_id = cx.flow.join_token().group_id.clone();
        cx.spawn(
            async move { delegate.promote_tab_group(group_id).await },
            StateEvent::Outcome,
        );
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::Exit
    }
}
