//! Share and manage flow states.

use collab_protocol::{
    CollaborationId, ErrorInfo, ErrorType, FlowType, GroupData, GroupToken, Outcome,
    TabGroupSharingResult,
};

use super::{ControllerState, Next, StateContext, StateEvent, StateId};
use crate::metrics::ShareOrManageEvent;

/// Shows the share dialog, which creates the people group.
pub(crate) struct ShowingShareScreenState;

impl ShowingShareScreenState {
    fn on_collaboration_id_created(
        &mut self,
        cx: &mut StateContext<'_>,
        outcome: Outcome,
        token: Option<GroupToken>,
    ) -> Next {
        if outcome == Outcome::Failure {
            cx.record_share(ShareOrManageEvent::CollaborationIdMissing);
            return self.handle_error(cx);
        }

        match token {
            Some(token) if token.is_valid() => {
                cx.flow.set_share_token(token);
                self.process_outcome(cx, outcome)
            }
            _ => {
                cx.record_share(ShareOrManageEvent::CollaborationIdInvalid);
                Next::Exit
            }
        }
    }
}

impl ControllerState for ShowingShareScreenState {
    fn id(&self) -> StateId {
        StateId::ShowingShareScreen
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        assert_eq!(cx.flow.flow_type(), FlowType::ShareOrManage);
        cx.record_share(ShareOrManageEvent::ShareDialogShown);

        let delegate = cx.delegate();
        let either_id = cx.flow.either_id();
        cx.spawn(
            async move { delegate.show_share_dialog(either_id).await },
            |(outcome, token): (Outcome, Option<GroupToken>)| {
                StateEvent::ShareDialogResult(outcome, token)
            },
        );
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::to(StateId::MakingTabGroupShared)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::ShareDialogResult(outcome, token) => {
                self.on_collaboration_id_created(cx, outcome, token)
            }
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            _ => Next::Stay,
        }
    }
}

/// Migrates the local tab group to a shared one and reads back the new
/// people group, concurrently.
#[derive(Default)]
pub(crate) struct MakingTabGroupSharedState {
    is_make_group_shared_complete: bool,
    is_read_group_complete: bool,
}

impl MakingTabGroupSharedState {
    fn maybe_proceed(&mut self, cx: &mut StateContext<'_>) -> Next {
        if self.is_make_group_shared_complete && self.is_read_group_complete {
            return self.on_processing_finished_with_success(cx);
        }
        Next::Stay
    }
}

impl ControllerState for MakingTabGroupSharedState {
    fn id(&self) -> StateId {
        StateId::MakingTabGroupShared
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        assert_eq!(cx.flow.flow_type(), FlowType::ShareOrManage);

        let local_group_id = cx
            .services
            .tab_group_sync
            .get_group(&cx.flow.either_id())
            .and_then(|group| group.local_group_id);
        let (Some(local_group_id), Some(token)) = (local_group_id, cx.flow.share_token().cloned())
        else {
            cx.record_share(ShareOrManageEvent::TabGroupMissingBeforeMigration);
            return self
                .handle_error(cx)
                .with_detail("tab group or share token missing before migration");
        };

        cx.record_share(ShareOrManageEvent::TabGroupShared);

        let tab_group_sync = cx.services.tab_group_sync.clone();
        let collaboration_id = CollaborationId::from(&token.group_id);
        cx.spawn(
            async move {
                tab_group_sync
                    .make_tab_group_shared(local_group_id, collaboration_id)
                    .await
            },
            StateEvent::TabGroupShared,
        );

        let data_sharing = cx.services.data_sharing.clone();
        let group_id = token.group_id;
        cx.spawn(
            async move { data_sharing.read_group_deprecated(&group_id).await },
            StateEvent::GroupRead,
        );
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::to(StateId::SharingTabGroupUrl)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::TabGroupShared(TabGroupSharingResult::Success) => {
                self.is_make_group_shared_complete = true;
                self.maybe_proceed(cx)
            }
            StateEvent::TabGroupShared(TabGroupSharingResult::Failure) => {
                cx.record_share(ShareOrManageEvent::MigrationFailure);
                self.handle_error(cx)
                    .with_detail("tab group could not be shared")
            }
            StateEvent::GroupRead(Ok(_)) => {
                self.is_read_group_complete = true;
                self.maybe_proceed(cx)
            }
            StateEvent::GroupRead(Err(failure)) => {
                cx.record_share(ShareOrManageEvent::ReadGroupFailed);
                self.handle_error(cx)
                    .with_detail(format!("shared group read failed: {failure}"))
            }
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            _ => Next::Stay,
        }
    }
}

/// Builds the invitation link and hands it to the UI. Terminal for shares.
pub(crate) struct SharingTabGroupUrlState;

impl ControllerState for SharingTabGroupUrlState {
    fn id(&self) -> StateId {
        StateId::SharingTabGroupUrl
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        assert_eq!(cx.flow.flow_type(), FlowType::ShareOrManage);

        let Some(token) = cx.flow.share_token().cloned() else {
            cx.record_share(ShareOrManageEvent::UrlCreationFailed);
            return Next::error(ErrorType::InvalidUrl).with_detail("share link could not be built");
        };
        let group_id = token.group_id.clone();
        let Some(url) = cx
            .services
            .data_sharing
            .get_data_sharing_url(&GroupData::from_token(token))
        else {
            cx.record_share(ShareOrManageEvent::UrlCreationFailed);
            return Next::error(ErrorType::InvalidUrl).with_detail("share link could not be built");
        };

        cx.record_share(ShareOrManageEvent::UrlReadyToShare);
        let delegate = cx.delegate();
        cx.spawn(
            async move { delegate.on_url_ready_to_share(group_id, url).await },
            StateEvent::Outcome,
        );
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::Exit
    }
}

/// Shows the manage dialog of an already shared tab group.
pub(crate) struct ShowingManageScreenState;

impl ControllerState for ShowingManageScreenState {
    fn id(&self) -> StateId {
        StateId::ShowingManageScreen
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        assert_eq!(cx.flow.flow_type(), FlowType::ShareOrManage);
        cx.record_share(ShareOrManageEvent::ManageDialogShown);

        let delegate = cx.delegate();
        let either_id = cx.flow.either_id();
        cx.spawn(
            async move { delegate.show_manage_dialog(either_id).await },
            StateEvent::Outcome,
        );
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::Exit
    }
}
