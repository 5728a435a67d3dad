//! Entry states: UI preparation, policy and sign-in.

use collab_protocol::{CollaborationStatus, ErrorInfo, ErrorType, FlowType, Outcome, SigninStatus};

use super::{
    ControllerState, Next, StateContext, StateEvent, StateId, Subscription, TimeoutReason,
    base_process_outcome,
};
use crate::metrics::{JoinEvent, ShareOrManageEvent};

/// Initial state. Asks the UI to get ready, then routes on token validity,
/// policy and sign-in.
#[derive(Default)]
pub(crate) struct PendingState;

impl ControllerState for PendingState {
    fn id(&self) -> StateId {
        StateId::Pending
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        let delegate = cx.delegate();
        let exit = cx.exit_handle();
        cx.spawn(
            async move { delegate.prepare_flow_ui(exit).await },
            StateEvent::Outcome,
        );
        Next::Stay
    }

    fn on_processing_finished_with_success(&mut self, cx: &mut StateContext<'_>) -> Next {
        if cx.flow.flow_type() == FlowType::Join && !cx.flow.join_token().is_valid() {
            cx.record_join(JoinEvent::ParsingFailure);
            return Next::error(ErrorType::InvalidUrl).with_detail("invitation link did not parse");
        }

        let status = cx.services.status.service_status();
        if !status.is_allowed_to_join() {
            return Next::to(StateId::WaitingForPolicyUpdate);
        }
        if !status.is_authentication_valid() {
            return Next::to(StateId::Authenticating);
        }
        Next::to(StateId::WaitingForServicesToInitialize)
    }
}

/// Waits for a pending account policy lookup, or explains why the feature
/// is disabled.
#[derive(Default)]
pub(crate) struct WaitingForPolicyUpdateState {
    status_observer: Option<Subscription>,
}

impl ControllerState for WaitingForPolicyUpdateState {
    fn id(&self) -> StateId {
        StateId::WaitingForPolicyUpdate
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        // Subscribe before reading so a resolution in between is not lost.
        let observer = cx.observe_status();
        let status = cx.services.status.service_status();
        if status.collaboration_status == CollaborationStatus::DisabledPending {
            cx.record_for_flow(
                JoinEvent::AccountInfoNotReadyOnSignin,
                ShareOrManageEvent::AccountInfoNotReadyOnSignin,
            );
            self.status_observer = Some(observer);
            return Next::Stay;
        }

        self.handle_error(cx)
    }

    fn handle_error(&mut self, cx: &mut StateContext<'_>) -> Next {
        let status = cx.services.status.service_status();
        if status.signin_status == SigninStatus::NotSignedIn {
            cx.record_for_flow(
                JoinEvent::DevicePolicyDisableSignin,
                ShareOrManageEvent::DevicePolicyDisableSignin,
            );
            return Next::error(ErrorType::SigninDisabledByPolicy);
        }

        cx.record_for_flow(
            JoinEvent::ManagedAccountSignin,
            ShareOrManageEvent::ManagedAccountSignin,
        );
        Next::error(ErrorType::SyncDisabledByPolicy)
    }

    fn on_processing_finished_with_success(&mut self, cx: &mut StateContext<'_>) -> Next {
        if cx.services.status.service_status().is_authentication_valid() {
            Next::to(StateId::CheckingFlowRequirements)
        } else {
            Next::to(StateId::Authenticating)
        }
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::ServiceStatusChanged(update) => {
                match update.new_status.collaboration_status {
                    CollaborationStatus::DisabledPending => Next::Stay,
                    CollaborationStatus::Disabled | CollaborationStatus::DisabledForPolicy => {
                        self.handle_error(cx)
                    }
                    CollaborationStatus::AllowedToJoin
                    | CollaborationStatus::EnabledJoinOnly
                    | CollaborationStatus::EnabledCreateAndJoin => {
                        self.on_processing_finished_with_success(cx)
                    }
                }
            }
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            _ => Next::Stay,
        }
    }

    fn on_exit(&mut self, _cx: &mut StateContext<'_>) {
        self.status_observer = None;
    }
}

/// Shows the sign-in UI and waits for sign-in and sync to be valid.
#[derive(Default)]
pub(crate) struct AuthenticatingState {
    status_observer: Option<Subscription>,
    timeout: Option<Subscription>,
}

impl AuthenticatingState {
    fn proceed(cx: &mut StateContext<'_>) -> Next {
        cx.delegate.notify_sign_in_and_sync_status_change();
        Next::to(StateId::WaitingForServicesToInitialize)
    }
}

impl ControllerState for AuthenticatingState {
    fn id(&self) -> StateId {
        StateId::Authenticating
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _error: &ErrorInfo) -> Next {
        cx.record_for_flow(JoinEvent::NotSignedIn, ShareOrManageEvent::NotSignedIn);

        let delegate = cx.delegate();
        cx.spawn(
            async move { delegate.show_authentication_ui().await },
            StateEvent::Outcome,
        );
        Next::Stay
    }

    fn process_outcome(&mut self, cx: &mut StateContext<'_>, outcome: Outcome) -> Next {
        if outcome == Outcome::Cancel {
            cx.record_for_flow(
                JoinEvent::CanceledNotSignedIn,
                ShareOrManageEvent::CanceledNotSignedIn,
            );
        }
        base_process_outcome(self, cx, outcome)
    }

    fn on_processing_finished_with_success(&mut self, cx: &mut StateContext<'_>) -> Next {
        let observer = cx.observe_status();
        let status = cx.services.status.service_status();
        if !status.is_allowed_to_join() {
            return Next::to(StateId::WaitingForPolicyUpdate);
        }

        if !status.is_authentication_valid() {
            // Sign-in may still complete out of band.
            let timeout = cx.services.timeouts.authentication();
            self.timeout = Some(cx.post_delayed(TimeoutReason::Authentication, timeout));
            self.status_observer = Some(observer);
            cx.record_for_flow(
                JoinEvent::SigninVerificationFailed,
                ShareOrManageEvent::SigninVerificationFailed,
            );
            return Next::Stay;
        }

        cx.record_for_flow(JoinEvent::SigninVerified, ShareOrManageEvent::SigninVerified);
        Self::proceed(cx)
    }

    fn on_event(&mut self, cx: &mut StateContext<'_>, event: StateEvent) -> Next {
        match event {
            StateEvent::Outcome(outcome) => self.process_outcome(cx, outcome),
            StateEvent::Timeout(TimeoutReason::Authentication) => {
                cx.record_for_flow(
                    JoinEvent::TimeoutWaitingForAuthentication,
                    ShareOrManageEvent::TimeoutWaitingForAuthentication,
                );
                self.handle_error(cx)
                    .with_detail("sign-in did not complete in time")
            }
            StateEvent::ServiceStatusChanged(update) => {
                let status = update.new_status;
                if !status.is_allowed_to_join() {
                    return Next::to(StateId::WaitingForPolicyUpdate);
                }
                if status.is_authentication_valid() {
                    cx.record_for_flow(
                        JoinEvent::SigninVerifiedInObserver,
                        ShareOrManageEvent::SigninVerifiedInObserver,
                    );
                    return Self::proceed(cx);
                }
                Next::Stay
            }
            _ => Next::Stay,
        }
    }

    fn on_exit(&mut self, _cx: &mut StateContext<'_>) {
        self.status_observer = None;
        self.timeout = None;
    }
}
