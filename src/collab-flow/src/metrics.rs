//! Flow milestone metrics.
//!
//! Every milestone is recorded twice: as an enumerated histogram sample
//! through the [`MetricsRecorder`] sink, and as an `info` log record.

use collab_protocol::{FlowType, MetricsRecorder};
use strum_macros::Display;
use tracing::{debug, info};

use crate::LOG_TARGET;

pub const JOIN_FLOW_HISTOGRAM: &str = "CollaborationService.JoinFlow";
pub const SHARE_OR_MANAGE_FLOW_HISTOGRAM: &str = "CollaborationService.ShareOrManageFlow";

/// Milestones of the join flow. Values are persisted; append only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[repr(u32)]
pub enum JoinEvent {
    Unknown = 0,
    Started = 1,
    Canceled = 2,
    CanceledNotSignedIn = 3,
    NotSignedIn = 4,
    Accepted = 5,
    OpenedNewGroup = 6,
    OpenedExistingGroup = 7,
    FlowRequirementsMet = 8,
    ParsingFailure = 9,
    SigninVerificationFailed = 10,
    SigninVerified = 11,
    SigninVerifiedInObserver = 12,
    FoundCollaborationWithoutTabGroup = 13,
    ReadNewGroupFailed = 14,
    ReadNewGroupSuccess = 15,
    AddedUserToGroup = 16,
    PreviewGroupFullError = 17,
    PreviewFailure = 18,
    PreviewSuccess = 19,
    GroupExistsWhenJoined = 20,
    TabGroupFetched = 21,
    PeopleGroupFetched = 22,
    PromoteTabGroup = 23,
    DataSharingReadyWhenStarted = 24,
    DataSharingServiceReadyObserved = 25,
    TabGroupServiceReady = 26,
    AllServicesReadyForFlow = 27,
    TimeoutWaitingForServicesReady = 28,
    TimeoutWaitingForSyncAndDataSharingGroup = 29,
    DevicePolicyDisableSignin = 30,
    ManagedAccountSignin = 31,
    AccountInfoNotReadyOnSignin = 32,
    TimeoutWaitingForAuthentication = 33,
}

impl JoinEvent {
    pub const MAX_VALUE: JoinEvent = JoinEvent::TimeoutWaitingForAuthentication;
}

/// Milestones of the share or manage flow. Values are persisted; append only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[repr(u32)]
pub enum ShareOrManageEvent {
    Unknown = 0,
    Started = 1,
    NotSignedIn = 2,
    CanceledNotSignedIn = 3,
    ShareDialogShown = 4,
    ManageDialogShown = 5,
    TabGroupShared = 6,
    UrlReadyToShare = 7,
    FlowRequirementsMet = 8,
    SigninVerificationFailed = 9,
    SigninVerified = 10,
    SigninVerifiedInObserver = 11,
    SyncedTabGroupNotFound = 12,
    CollaborationIdMissing = 13,
    CollaborationIdInvalid = 14,
    TabGroupMissingBeforeMigration = 15,
    MigrationFailure = 16,
    ReadGroupFailed = 17,
    UrlCreationFailed = 18,
    DataSharingReadyWhenStarted = 19,
    DataSharingServiceReadyObserved = 20,
    TabGroupServiceReady = 21,
    AllServicesReadyForFlow = 22,
    DevicePolicyDisableSignin = 23,
    ManagedAccountSignin = 24,
    AccountInfoNotReadyOnSignin = 25,
    TimeoutWaitingForServicesReady = 26,
    TimeoutWaitingForAuthentication = 27,
}

impl ShareOrManageEvent {
    pub const MAX_VALUE: ShareOrManageEvent = ShareOrManageEvent::TimeoutWaitingForAuthentication;
}

pub fn record_join_event(recorder: &dyn MetricsRecorder, event: JoinEvent) {
    recorder.record_enumeration(
        JOIN_FLOW_HISTOGRAM,
        event as u32,
        JoinEvent::MAX_VALUE as u32 + 1,
    );
    info!(target: LOG_TARGET, "Join Flow Event [{}]", event);
}

pub fn record_share_or_manage_event(recorder: &dyn MetricsRecorder, event: ShareOrManageEvent) {
    recorder.record_enumeration(
        SHARE_OR_MANAGE_FLOW_HISTOGRAM,
        event as u32,
        ShareOrManageEvent::MAX_VALUE as u32 + 1,
    );
    info!(target: LOG_TARGET, "Share or Manage Flow Event [{}]", event);
}

/// Records whichever of the two events matches `flow_type`.
pub fn record_join_or_share_or_manage_event(
    recorder: &dyn MetricsRecorder,
    flow_type: FlowType,
    join_event: JoinEvent,
    share_or_manage_event: ShareOrManageEvent,
) {
    match flow_type {
        FlowType::Join => record_join_event(recorder, join_event),
        FlowType::ShareOrManage => record_share_or_manage_event(recorder, share_or_manage_event),
    }
}

/// Sink that only logs samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsRecorder;

impl MetricsRecorder for TracingMetricsRecorder {
    fn record_enumeration(&self, histogram: &'static str, sample: u32, exclusive_max: u32) {
        debug!(target: LOG_TARGET, histogram, sample, exclusive_max, "histogram sample");
    }
}

/// Sink that discards samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsRecorder;

impl MetricsRecorder for NoopMetricsRecorder {
    fn record_enumeration(&self, _histogram: &'static str, _sample: u32, _exclusive_max: u32) {}
}
