use collab_protocol::{ErrorInfo, Outcome};

use super::{ControllerState, Next, StateContext, StateEvent, StateId};

/// Shows the error; any outcome of the error UI ends the flow.
pub(crate) struct ErrorState;

impl ControllerState for ErrorState {
    fn id(&self) -> StateId {
        StateId::Error
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, error: &ErrorInfo) -> Next {
        let delegate = cx.delegate();
        let error = error.clone();
        cx.spawn(
            async move { delegate.show_error(error).await },
            StateEvent::Outcome,
        );
        Next::Stay
    }

    fn process_outcome(&mut self, _cx: &mut StateContext<'_>, _outcome: Outcome) -> Next {
        Next::Exit
    }

    fn handle_error(&mut self, _cx: &mut StateContext<'_>) -> Next {
        Next::Exit
    }
}
