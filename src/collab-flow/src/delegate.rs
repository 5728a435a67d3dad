//! UI boundary of a flow.

use async_trait::async_trait;
use collab_protocol::{EitherGroupId, ErrorInfo, GroupId, GroupToken, Outcome, SharedDataPreview};
use tokio::sync::mpsc;
use url::Url;

use crate::controller::{Command, Envelope};

/// UI surface driven by a controller.
///
/// Every async method resolves once the user (or the UI) is done with the
/// step. A controller drops the pending future when it leaves the state
/// that asked, so implementations must tolerate being cancelled.
#[async_trait]
pub trait CollaborationControllerDelegate: Send + Sync {
    /// Prepares the UI. `exit` lets the UI end the flow at any later
    /// point, e.g. when its window closes.
    async fn prepare_flow_ui(&self, exit: FlowExitHandle) -> Outcome;

    async fn show_error(&self, error: ErrorInfo) -> Outcome;

    async fn show_authentication_ui(&self) -> Outcome;

    async fn show_join_dialog(&self, token: GroupToken, preview: SharedDataPreview) -> Outcome;

    /// Shows the share dialog. On success, carries the token of the newly
    /// created people group.
    async fn show_share_dialog(&self, either_id: EitherGroupId) -> (Outcome, Option<GroupToken>);

    async fn on_url_ready_to_share(&self, group_id: GroupId, url: Url) -> Outcome;

    async fn show_manage_dialog(&self, either_id: EitherGroupId) -> Outcome;

    /// Brings the local tab group of `group_id` to the foreground.
    async fn promote_tab_group(&self, group_id: GroupId) -> Outcome;

    fn notify_sign_in_and_sync_status_change(&self);

    /// Brings the flow's current screen to the foreground.
    fn promote_current_screen(&self);

    fn on_flow_finished(&self);
}

/// Lets the UI end its flow.
#[derive(Debug, Clone)]
pub struct FlowExitHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl FlowExitHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }

    /// Requests exit. No-op once the flow is gone.
    pub fn exit(&self) {
        let _ = self.tx.send(Envelope::Command(Command::Exit));
    }
}
