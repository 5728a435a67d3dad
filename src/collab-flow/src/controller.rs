//! Flow controller.
//!
//! A controller is an actor: one tokio task owns the flow, the current state
//! object and the collaborators, and drains a channel of events. Delegate
//! callbacks, store results, timers and observer notifications all arrive
//! through that channel, so state hooks never run concurrently and a
//! transition never overlaps another.

use std::fmt;
use std::sync::Arc;

use collab_protocol::ErrorInfo;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::LOG_TARGET;
use crate::collaborators::Collaborators;
use crate::delegate::CollaborationControllerDelegate;
use crate::flow::Flow;
use crate::state::{
    ControllerState, Next, StateContext, StateEvent, StatePoster, StateId, create_state_object,
    is_valid_state_transition,
};

/// Unique identifier of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId(Uuid);

impl FlowId {
    /// Create a new random flow ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run once with the controller's id after it has finished; used by the
/// owner to drop its registry entry.
pub type FinishCallback = Box<dyn FnOnce(FlowId) + Send + 'static>;

/// Requests from outside the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Exit,
    Promote,
}

/// Message drained by the controller task.
#[derive(Debug)]
pub(crate) enum Envelope {
    /// Addressed to the state entered at `epoch`.
    State { epoch: u64, event: StateEvent },
    Command(Command),
}

/// Handle to a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    id: FlowId,
    tx: mpsc::UnboundedSender<Envelope>,
    state_rx: watch::Receiver<StateId>,
    history: Arc<Mutex<Vec<StateId>>>,
    done: CancellationToken,
}

impl ControllerHandle {
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Ends the flow. Idempotent.
    pub fn exit(&self) {
        let _ = self.tx.send(Envelope::Command(Command::Exit));
    }

    /// Brings the flow's current screen to the foreground.
    pub fn promote_current_session(&self) {
        let _ = self.tx.send(Envelope::Command(Command::Promote));
    }

    /// Current state.
    pub fn state(&self) -> StateId {
        *self.state_rx.borrow()
    }

    /// Every state entered so far, in order, starting with `Pending`.
    pub fn history(&self) -> Vec<StateId> {
        self.history.lock().clone()
    }

    /// Waits until the flow is in `state`. Returns false if the flow
    /// finished first.
    pub async fn wait_for_state(&self, state: StateId) -> bool {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|current| *current == state).await.is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Resolves once the finish callback has run.
    pub async fn finished(&self) {
        self.done.cancelled().await
    }
}

impl fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Runs the owner's finish callback and releases waiters when the controller
/// is dropped, whether its task returned or unwound.
struct Teardown {
    id: FlowId,
    delegate: Arc<dyn CollaborationControllerDelegate>,
    /// Set once the delegate has been told the flow finished.
    delegate_notified: bool,
    finish_and_delete: Option<FinishCallback>,
    done: CancellationToken,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if !self.delegate_notified {
            // The task panicked or the runtime shut down mid-flow.
            warn!(target: LOG_TARGET, flow_id = %self.id, "flow dropped before exiting");
            self.delegate_notified = true;
            self.delegate.on_flow_finished();
        }
        if let Some(finish_and_delete) = self.finish_and_delete.take() {
            finish_and_delete(self.id);
        }
        self.done.cancel();
    }
}

/// Drives one flow through its states.
pub struct CollaborationController {
    flow: Flow,
    services: Collaborators,
    delegate: Arc<dyn CollaborationControllerDelegate>,
    current: Box<dyn ControllerState>,
    /// Bumped on every transition; events from older states are dropped.
    epoch: u64,
    state_token: CancellationToken,
    tx: mpsc::UnboundedSender<Envelope>,
    state_tx: watch::Sender<StateId>,
    history: Arc<Mutex<Vec<StateId>>>,
    is_deleting: bool,
    teardown: Teardown,
}

impl CollaborationController {
    /// Starts a controller task in `Pending`. Must be called inside a tokio
    /// runtime.
    pub fn spawn(
        flow: Flow,
        services: Collaborators,
        delegate: Arc<dyn CollaborationControllerDelegate>,
        finish_and_delete: FinishCallback,
    ) -> ControllerHandle {
        let id = FlowId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(StateId::Pending);
        let history = Arc::new(Mutex::new(vec![StateId::Pending]));
        let done = CancellationToken::new();

        debug!(target: LOG_TARGET, flow_id = %id, flow_type = %flow.flow_type(), "starting flow");

        let teardown = Teardown {
            id,
            delegate: Arc::clone(&delegate),
            delegate_notified: false,
            finish_and_delete: Some(finish_and_delete),
            done: done.clone(),
        };
        let controller = Self {
            flow,
            services,
            delegate,
            current: create_state_object(StateId::Pending),
            epoch: 0,
            state_token: CancellationToken::new(),
            tx: tx.clone(),
            state_tx,
            history: Arc::clone(&history),
            is_deleting: false,
            teardown,
        };
        tokio::spawn(controller.run(rx));

        ControllerHandle {
            id,
            tx,
            state_rx,
            history,
            done,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        let next = {
            let (current, mut cx) = self.split();
            current.on_enter(&mut cx, &ErrorInfo::none())
        };
        self.apply(next);

        while !self.is_deleting {
            let Some(envelope) = rx.recv().await else {
                break;
            };
            match envelope {
                Envelope::State { epoch, event } => {
                    if epoch != self.epoch {
                        trace!(target: LOG_TARGET, epoch, current = self.epoch, "dropping stale event");
                        continue;
                    }
                    let next = {
                        let (current, mut cx) = self.split();
                        current.on_event(&mut cx, event)
                    };
                    self.apply(next);
                }
                Envelope::Command(Command::Exit) => self.exit(),
                Envelope::Command(Command::Promote) => self.promote_current_session(),
            }
        }

        // Let whatever triggered the exit unwind before the owner drops us.
        tokio::task::yield_now().await;
        drop(rx);
        // Dropping `self` runs the teardown.
    }

    /// Borrows the current state and a context over the other fields.
    fn split(&mut self) -> (&mut Box<dyn ControllerState>, StateContext<'_>) {
        let poster = StatePoster::new(self.tx.clone(), self.epoch, self.state_token.clone());
        let cx = StateContext::new(&mut self.flow, &self.services, &self.delegate, poster);
        (&mut self.current, cx)
    }

    fn apply(&mut self, mut next: Next) {
        loop {
            match next {
                Next::Stay => return,
                Next::Exit => {
                    self.exit();
                    return;
                }
                Next::TransitionTo(state, error) => {
                    next = self.transition_to(state, error);
                }
            }
        }
    }

    fn transition_to(&mut self, state: StateId, error: ErrorInfo) -> Next {
        let previous = self.current.id();
        if error.is_error() {
            info!(
                target: LOG_TARGET,
                "State Transition to [{}] from previous state [{}] with error [{}]",
                state,
                previous,
                error.log_string()
            );
        } else {
            info!(
                target: LOG_TARGET,
                "State Transition to [{}] from previous state [{}]", state, previous
            );
        }
        debug!(target: LOG_TARGET, "Transition from {} to {}", previous, state);

        assert!(
            is_valid_state_transition(previous, state),
            "Illegal transition from {previous} to {state}"
        );

        self.leave_current_state();
        self.current = create_state_object(state);
        self.history.lock().push(state);
        self.state_tx.send_replace(state);

        let (current, mut cx) = self.split();
        current.on_enter(&mut cx, &error)
    }

    /// Runs `on_exit` and invalidates everything the state started.
    fn leave_current_state(&mut self) {
        {
            let (current, mut cx) = self.split();
            current.on_exit(&mut cx);
        }
        self.state_token.cancel();
        self.state_token = CancellationToken::new();
        self.epoch += 1;
    }

    fn exit(&mut self) {
        if self.is_deleting {
            debug!(target: LOG_TARGET, "exit already pending");
            return;
        }
        self.leave_current_state();
        self.teardown.delegate_notified = true;
        self.delegate.on_flow_finished();
        self.is_deleting = true;
    }

    fn promote_current_session(&self) {
        self.delegate.promote_current_screen();
    }
}

impl Drop for CollaborationController {
    fn drop(&mut self) {
        // Stops work the current state started; `teardown` runs after this.
        self.state_token.cancel();
    }
}
