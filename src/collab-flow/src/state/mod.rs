//! Flow states.
//!
//! One handler object exists per active state. Handlers never call back
//! into the controller: every hook returns a [`Next`] command that the
//! controller applies after the hook returns. Asynchronous work (dialogs,
//! network reads, timers, observer relays) is started through the
//! [`StateContext`] and reported back as a [`StateEvent`] tagged with the
//! state's epoch, so results addressed to a state that has already exited
//! are dropped.

mod error;
mod join;
mod pending;
mod services;
mod share;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use collab_protocol::{
    DataPreviewActionFailure, DataSharingEvent, ErrorInfo, ErrorType, GroupData, GroupToken,
    Outcome, PeopleGroupActionFailure, ServiceStatusUpdate, SharedDataPreview,
    TabGroupSharingResult, TabGroupSyncEvent,
};
use strum_macros::Display;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{trace, warn};

use crate::LOG_TARGET;
use crate::collaborators::Collaborators;
use crate::controller::Envelope;
use crate::delegate::{CollaborationControllerDelegate, FlowExitHandle};
use crate::flow::Flow;
use crate::metrics::{self, JoinEvent, ShareOrManageEvent};

pub(crate) use error::ErrorState;
pub(crate) use join::{
    AddingUserToGroupState, OpeningLocalTabGroupState, WaitingForSyncAndDataSharingGroupState,
};
pub(crate) use pending::{AuthenticatingState, PendingState, WaitingForPolicyUpdateState};
pub(crate) use services::{CheckingFlowRequirementsState, WaitingForServicesToInitializeState};
pub(crate) use share::{
    MakingTabGroupSharedState, SharingTabGroupUrlState, ShowingManageScreenState,
    ShowingShareScreenState,
};

/// States of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StateId {
    Pending,
    WaitingForPolicyUpdate,
    Authenticating,
    WaitingForServicesToInitialize,
    CheckingFlowRequirements,
    AddingUserToGroup,
    WaitingForSyncAndDataSharingGroup,
    OpeningLocalTabGroup,
    ShowingShareScreen,
    MakingTabGroupShared,
    SharingTabGroupUrl,
    ShowingManageScreen,
    Cancel,
    Error,
}

/// Allowed `(from, to)` transitions.
const VALID_TRANSITIONS: &[(StateId, StateId)] = {
    use StateId::*;
    &[
        // Initial state.
        (Pending, WaitingForPolicyUpdate),
        (Pending, Authenticating),
        (Pending, WaitingForServicesToInitialize),
        (Pending, Cancel),
        (Pending, Error),
        // Policy.
        (WaitingForPolicyUpdate, Authenticating),
        (WaitingForPolicyUpdate, CheckingFlowRequirements),
        (WaitingForPolicyUpdate, Cancel),
        (WaitingForPolicyUpdate, Error),
        // Sign-in.
        (Authenticating, WaitingForPolicyUpdate),
        (Authenticating, WaitingForServicesToInitialize),
        (Authenticating, Cancel),
        (Authenticating, Error),
        (WaitingForServicesToInitialize, CheckingFlowRequirements),
        (WaitingForServicesToInitialize, Cancel),
        (WaitingForServicesToInitialize, Error),
        (CheckingFlowRequirements, AddingUserToGroup),
        (CheckingFlowRequirements, OpeningLocalTabGroup),
        (CheckingFlowRequirements, WaitingForSyncAndDataSharingGroup),
        (CheckingFlowRequirements, ShowingShareScreen),
        (CheckingFlowRequirements, ShowingManageScreen),
        (CheckingFlowRequirements, Cancel),
        (CheckingFlowRequirements, Error),
        // Join.
        (AddingUserToGroup, WaitingForSyncAndDataSharingGroup),
        (AddingUserToGroup, OpeningLocalTabGroup),
        (AddingUserToGroup, Cancel),
        (AddingUserToGroup, Error),
        (WaitingForSyncAndDataSharingGroup, OpeningLocalTabGroup),
        (WaitingForSyncAndDataSharingGroup, Cancel),
        (WaitingForSyncAndDataSharingGroup, Error),
        (OpeningLocalTabGroup, Cancel),
        (OpeningLocalTabGroup, Error),
        // Share.
        (ShowingShareScreen, MakingTabGroupShared),
        (ShowingShareScreen, Cancel),
        (ShowingShareScreen, Error),
        (MakingTabGroupShared, SharingTabGroupUrl),
        (MakingTabGroupShared, Cancel),
        (MakingTabGroupShared, Error),
        (SharingTabGroupUrl, Cancel),
        (SharingTabGroupUrl, Error),
        // Manage.
        (ShowingManageScreen, Cancel),
        (ShowingManageScreen, Error),
    ]
};

/// Whether `from -> to` is in the transition allow-list.
pub fn is_valid_state_transition(from: StateId, to: StateId) -> bool {
    VALID_TRANSITIONS.contains(&(from, to))
}

/// What the controller does after a state hook returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Next {
    Stay,
    TransitionTo(StateId, ErrorInfo),
    Exit,
}

impl Next {
    pub(crate) fn to(state: StateId) -> Self {
        Next::TransitionTo(state, ErrorInfo::none())
    }

    pub(crate) fn error(error_type: ErrorType) -> Self {
        Next::TransitionTo(StateId::Error, ErrorInfo::new(error_type))
    }

    /// Attaches `detail` to the error this transition carries. Anything
    /// else passes through unchanged.
    pub(crate) fn with_detail(self, detail: impl Into<String>) -> Self {
        match self {
            Next::TransitionTo(state, error) if error.is_error() => {
                Next::TransitionTo(state, error.with_detail(detail))
            }
            other => other,
        }
    }
}

/// Timers armed by waiting states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeoutReason {
    ServicesReady,
    SyncAndPeopleGroup,
    Authentication,
}

/// Results and notifications delivered to the current state.
#[derive(Debug, Clone)]
pub(crate) enum StateEvent {
    Outcome(Outcome),
    ShareDialogResult(Outcome, Option<GroupToken>),
    NewGroupRead(Result<GroupData, PeopleGroupActionFailure>),
    PreviewFetched(Result<SharedDataPreview, DataPreviewActionFailure>),
    TabGroupShared(TabGroupSharingResult),
    GroupRead(Result<GroupData, PeopleGroupActionFailure>),
    Timeout(TimeoutReason),
    ServiceStatusChanged(ServiceStatusUpdate),
    DataSharing(DataSharingEvent),
    TabGroupSync(TabGroupSyncEvent),
}

/// Observer registration owned by a state. Dropping it stops the relay.
pub(crate) struct Subscription {
    _guard: DropGuard,
}

/// Posts events on behalf of one state.
#[derive(Clone)]
pub(crate) struct StatePoster {
    tx: mpsc::UnboundedSender<Envelope>,
    epoch: u64,
    token: CancellationToken,
}

impl StatePoster {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Envelope>,
        epoch: u64,
        token: CancellationToken,
    ) -> Self {
        Self { tx, epoch, token }
    }

    fn post(&self, event: StateEvent) {
        // The controller may already be gone.
        let _ = self.tx.send(Envelope::State {
            epoch: self.epoch,
            event,
        });
    }
}

/// What a state hook can reach.
pub(crate) struct StateContext<'a> {
    pub flow: &'a mut Flow,
    pub services: &'a Collaborators,
    pub delegate: &'a Arc<dyn CollaborationControllerDelegate>,
    poster: StatePoster,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(
        flow: &'a mut Flow,
        services: &'a Collaborators,
        delegate: &'a Arc<dyn CollaborationControllerDelegate>,
        poster: StatePoster,
    ) -> Self {
        Self {
            flow,
            services,
            delegate,
            poster,
        }
    }

    pub fn delegate(&self) -> Arc<dyn CollaborationControllerDelegate> {
        Arc::clone(self.delegate)
    }

    pub fn exit_handle(&self) -> FlowExitHandle {
        FlowExitHandle::new(self.poster.tx.clone())
    }

    /// Runs `fut` and posts `map(output)` to this state. Abandoned when the
    /// state exits.
    pub fn spawn<F, T>(&self, fut: F, map: impl FnOnce(T) -> StateEvent + Send + 'static)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let poster = self.poster.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = poster.token.cancelled() => {}
                output = fut => poster.post(map(output)),
            }
        });
    }

    /// Runs `fut` to completion regardless of this state's lifetime and
    /// drops its output.
    pub fn spawn_detached<F>(&self, fut: F)
    where
        F: Future + Send + 'static,
    {
        tokio::spawn(async move {
            let _ = fut.await;
        });
    }

    /// Posts [`StateEvent::Timeout`] after `delay` unless the returned
    /// subscription is dropped or the state exits first.
    pub fn post_delayed(&self, reason: TimeoutReason, delay: Duration) -> Subscription {
        let token = self.poster.token.child_token();
        let poster = self.poster.clone();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => poster.post(StateEvent::Timeout(reason)),
            }
        });
        Subscription {
            _guard: token.drop_guard(),
        }
    }

    pub fn observe_status(&self) -> Subscription {
        self.relay(
            self.services.status.subscribe(),
            StateEvent::ServiceStatusChanged,
        )
    }

    pub fn observe_data_sharing(&self) -> Subscription {
        self.relay(
            self.services.data_sharing.subscribe(),
            StateEvent::DataSharing,
        )
    }

    pub fn observe_tab_group_sync(&self) -> Subscription {
        self.relay(
            self.services.tab_group_sync.subscribe(),
            StateEvent::TabGroupSync,
        )
    }

    /// Forwards every notification of `rx` to this state. The receiver is
    /// created by the caller before returning, so nothing sent after this
    /// call is missed.
    fn relay<T>(
        &self,
        mut rx: broadcast::Receiver<T>,
        map: fn(T) -> StateEvent,
    ) -> Subscription
    where
        T: Clone + Send + 'static,
    {
        let token = self.poster.token.child_token();
        let poster = self.poster.clone();
        let cancelled = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(value) => poster.post(map(value)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(target: LOG_TARGET, skipped, "observer lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
        Subscription {
            _guard: token.drop_guard(),
        }
    }

    pub fn record_join(&self, event: JoinEvent) {
        metrics::record_join_event(self.services.metrics.as_ref(), event);
    }

    pub fn record_share(&self, event: ShareOrManageEvent) {
        metrics::record_share_or_manage_event(self.services.metrics.as_ref(), event);
    }

    /// Records the event matching this flow's type.
    pub fn record_for_flow(&self, join_event: JoinEvent, share_event: ShareOrManageEvent) {
        metrics::record_join_or_share_or_manage_event(
            self.services.metrics.as_ref(),
            self.flow.flow_type(),
            join_event,
            share_event,
        );
    }
}

/// Behaviour of one state.
pub(crate) trait ControllerState: Send {
    fn id(&self) -> StateId;

    /// Starts the state's work.
    fn on_enter(&mut self, _cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        Next::Stay
    }

    /// Failure goes to [`ControllerState::handle_error`], cancel exits the
    /// flow, success goes to
    /// [`ControllerState::on_processing_finished_with_success`].
    fn process_outcome(&mut self, cx: &mut StateContext<'_>, outcome: Outcome) -> Next {
        base_process_outcome(self, cx, outcome)
    }

    fn handle_error(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::error(ErrorType::GenericError)
    }

    fn on_processing_finished_with_success(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::Stay
    }

    /// Dispatches an event addressed to this state.
    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            other => {
                trace!(target: LOG_TARGET, state = %self.id(), event = ?other, "event ignored");
                Next::Stay
            }
        }
    }

    /// Releases what the state holds. Subscriptions held in fields are
    /// dropped with the state object.
    fn on_exit(&mut self, _cx: &mut StateContext<'_>) {}
}

pub(crate) fn base_process_outcome<S>(
    state: &mut S,
    cx: &mut StateContext<'_>,
    outcome: Outcome,
) -> Next
where
    S: ControllerState + ?Sized,
{
    match outcome {
        Outcome::Failure => state.handle_error(cx),
        Outcome::Cancel => Next::Exit,
        Outcome::Success => state.on_processing_finished_with_success(cx),
    }
}

/// Base state without behaviour; `Cancel` is never entered in practice.
struct CancelState;

impl ControllerState for CancelState {
    fn id(&self) -> StateId {
        StateId::Cancel
    }
}

pub(crate) fn create_state_object(state: StateId) -> Box<dyn ControllerState> {
    match state {
        StateId::Pending => Box::new(PendingState::default()),
        StateId::WaitingForPolicyUpdate => Box::new(WaitingForPolicyUpdateState::default()),
        StateId::Authenticating => Box::new(AuthenticatingState::default()),
        StateId::WaitingForServicesToInitialize => {
            Box::new(WaitingForServicesToInitializeState::default())
        }
        StateId::CheckingFlowRequirements => Box::new(CheckingFlowRequirementsState),
        StateId::AddingUserToGroup => Box::new(AddingUserToGroupState),
        StateId::WaitingForSyncAndDataSharingGroup => {
            Box::new(WaitingForSyncAndDataSharingGroupState::default())
        }
        StateId::OpeningLocalTabGroup => Box::new(OpeningLocalTabGroupState),
        StateId::ShowingShareScreen => Box::new(ShowingShareScreenState),
        StateId::MakingTabGroupShared => Box::new(MakingTabGroupSharedState::default()),
        StateId::SharingTabGroupUrl => Box::new(SharingTabGroupUrlState),
        StateId::ShowingManageScreen => Box::new(ShowingManageScreenState),
        StateId::Cancel => Box::new(CancelState),
        StateId::Error => Box::new(ErrorState),
    }
}
