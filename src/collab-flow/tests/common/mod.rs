//! Shared fixtures for the collaboration flow integration tests.
//!
//! - In-memory people group store, tab group sync store, identity and sync
//! - A delegate that records every call and can hold any step open
//! - A metrics sink that keeps every sample

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};
use url::Url;

use collab_flow::metrics::{JOIN_FLOW_HISTOGRAM, SHARE_OR_MANAGE_FLOW_HISTOGRAM};
use collab_flow::{
    CollaborationConfig, CollaborationControllerDelegate, CollaborationService, ControllerHandle,
    FlowExitHandle, JoinEvent, ShareOrManageEvent,
};
use collab_protocol::{
    AccountInfo, CollaborationId, DataPreviewActionFailure, DataSharingEvent, DataSharingService,
    EitherGroupId, ErrorInfo, ErrorType, GroupData, GroupId, GroupMember, GroupToken,
    IdentityEvent, IdentityManager, LocalTabGroupId, ManagedStatus, MemberRole, MetricsRecorder,
    Outcome, ParseUrlError, PeopleGroupActionFailure, PeopleGroupActionOutcome, SavedTabGroup,
    SharedDataPreview, SharedTabGroupPreview, SyncEvent, SyncService, TabGroupSharingResult,
    TabGroupSyncEvent, TabGroupSyncService, TabPreview, TriggerSource, UserSelectableType,
};

const CHANNEL_CAPACITY: usize = 64;
const INVITATION_HOST: &str = "collab.example";

/// Gaia id of the signed-in test user.
pub const SELF_GAIA_ID: &str = "gaia-self";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("collaboration=debug"))
        .with_test_writer()
        .try_init();
}

/// Lets spawned tasks run. Under a paused clock this advances time by a
/// few milliseconds, well below any flow timeout.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn invitation(group: &str) -> GroupToken {
    GroupToken::new(GroupId::new(group), format!("{group}-secret"))
}

pub fn join_url(token: &GroupToken) -> Url {
    let mut url = Url::parse(&format!("https://{INVITATION_HOST}/join")).expect("static url");
    url.query_pairs_mut()
        .append_pair("group_id", token.group_id.as_str())
        .append_pair("token", &token.access_token);
    url
}

/// People group owned by someone else with the test user as a member.
pub fn people_group(token: &GroupToken) -> GroupData {
    GroupData {
        group_token: token.clone(),
        display_name: "Trip".to_string(),
        members: vec![
            GroupMember {
                gaia_id: "gaia-owner".to_string(),
                display_name: "Owner".to_string(),
                email: "owner@gmail.com".to_string(),
                role: MemberRole::Owner,
            },
            GroupMember {
                gaia_id: SELF_GAIA_ID.to_string(),
                display_name: "Me".to_string(),
                email: "me@gmail.com".to_string(),
                role: MemberRole::Member,
            },
        ],
    }
}

/// Tab group shared with `group_id` and open locally.
pub fn shared_tab_group(group_id: &GroupId) -> SavedTabGroup {
    SavedTabGroup::new("Trip")
        .with_local_id(LocalTabGroupId::new())
        .with_collaboration_id(CollaborationId::from(group_id))
}

pub fn tab_group_preview() -> SharedDataPreview {
    SharedDataPreview {
        shared_tab_group_preview: Some(SharedTabGroupPreview {
            title: "Trip".to_string(),
            tabs: vec![TabPreview {
                url: Url::parse("https://maps.example/route").expect("static url"),
            }],
        }),
    }
}

// =============================================================================
// Identity and sync
// =============================================================================

struct IdentityState {
    account: Option<AccountInfo>,
    managed: ManagedStatus,
}

pub struct FakeIdentity {
    state: Mutex<IdentityState>,
    tx: broadcast::Sender<IdentityEvent>,
}

impl FakeIdentity {
    pub fn signed_in(email: &str) -> Self {
        Self::with_account(Some(account(email)), ManagedStatus::ConsumerGmail)
    }

    pub fn signed_out() -> Self {
        Self::with_account(None, ManagedStatus::ConsumerGmail)
    }

    /// Signed in with a managed status lookup still in flight.
    pub fn pending_policy(email: &str) -> Self {
        Self::with_account(Some(account(email)), ManagedStatus::Pending)
    }

    fn with_account(account: Option<AccountInfo>, managed: ManagedStatus) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(IdentityState { account, managed }),
            tx,
        }
    }

    pub fn sign_in(&self, email: &str) {
        self.state.lock().account = Some(account(email));
        self.notify(IdentityEvent::PrimaryAccountChanged);
    }

    pub fn sign_out(&self) {
        self.state.lock().account = None;
        self.notify(IdentityEvent::PrimaryAccountChanged);
    }

    pub fn resolve_managed_status(&self, managed: ManagedStatus) {
        self.state.lock().managed = managed;
        self.notify(IdentityEvent::AccountManagedStatusResolved);
    }

    pub fn notify(&self, event: IdentityEvent) {
        let _ = self.tx.send(event);
    }
}

fn account(email: &str) -> AccountInfo {
    AccountInfo {
        account_id: "account-self".to_string(),
        gaia_id: SELF_GAIA_ID.to_string(),
        email: email.to_string(),
    }
}

impl IdentityManager for FakeIdentity {
    fn primary_account(&self) -> Option<AccountInfo> {
        self.state.lock().account.clone()
    }

    fn has_primary_account_with_refresh_token(&self) -> bool {
        self.state.lock().account.is_some()
    }

    fn is_primary_account_in_persistent_error(&self) -> bool {
        false
    }

    fn account_managed_status(&self, _account: &AccountInfo) -> ManagedStatus {
        self.state.lock().managed
    }

    fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.tx.subscribe()
    }
}

pub struct FakeSync {
    selected: Mutex<Vec<UserSelectableType>>,
    tx: broadcast::Sender<SyncEvent>,
}

impl FakeSync {
    pub fn syncing() -> Self {
        Self::with_types(vec![UserSelectableType::SavedTabGroups, UserSelectableType::Tabs])
    }

    pub fn not_syncing() -> Self {
        Self::with_types(Vec::new())
    }

    fn with_types(selected: Vec<UserSelectableType>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            selected: Mutex::new(selected),
            tx,
        }
    }

    pub fn enable(&self) {
        *self.selected.lock() = vec![UserSelectableType::SavedTabGroups, UserSelectableType::Tabs];
        let _ = self.tx.send(SyncEvent::StateChanged);
    }

    pub fn disable(&self) {
        self.selected.lock().clear();
        let _ = self.tx.send(SyncEvent::StateChanged);
    }
}

impl SyncService for FakeSync {
    fn selected_types(&self) -> Vec<UserSelectableType> {
        self.selected.lock().clone()
    }

    fn is_sync_feature_enabled(&self) -> bool {
        !self.selected.lock().is_empty()
    }

    fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

// =============================================================================
// People group store
// =============================================================================

pub struct FakeDataSharing {
    loaded: Mutex<bool>,
    groups: Mutex<HashMap<GroupId, GroupData>>,
    new_group_failure: Mutex<Option<PeopleGroupActionFailure>>,
    read_group_failure: Mutex<Option<PeopleGroupActionFailure>>,
    preview: Mutex<Result<SharedDataPreview, DataPreviewActionFailure>>,
    removal_outcome: Mutex<PeopleGroupActionOutcome>,
    url_creation_fails: Mutex<bool>,
    read_new_group_calls: AtomicUsize,
    read_group_deprecated_calls: AtomicUsize,
    tx: broadcast::Sender<DataSharingEvent>,
}

impl FakeDataSharing {
    pub fn new(loaded: bool) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            loaded: Mutex::new(loaded),
            groups: Mutex::new(HashMap::new()),
            new_group_failure: Mutex::new(None),
            read_group_failure: Mutex::new(None),
            preview: Mutex::new(Ok(tab_group_preview())),
            removal_outcome: Mutex::new(PeopleGroupActionOutcome::Success),
            url_creation_fails: Mutex::new(false),
            read_new_group_calls: AtomicUsize::new(0),
            read_group_deprecated_calls: AtomicUsize::new(0),
            tx,
        }
    }

    pub fn finish_loading(&self) {
        *self.loaded.lock() = true;
        let _ = self.tx.send(DataSharingEvent::GroupDataModelLoaded);
    }

    /// Puts `group` in the cache without notifying.
    pub fn insert_group(&self, group: GroupData) {
        self.groups
            .lock()
            .insert(group.group_token.group_id.clone(), group);
    }

    /// Puts `group` in the cache and notifies observers.
    pub fn add_group(&self, group: GroupData) {
        self.insert_group(group.clone());
        let _ = self.tx.send(DataSharingEvent::GroupAdded {
            group,
            event_time: Utc::now(),
        });
    }

    pub fn fail_read_new_group(&self, failure: PeopleGroupActionFailure) {
        *self.new_group_failure.lock() = Some(failure);
    }

    pub fn fail_read_group(&self, failure: PeopleGroupActionFailure) {
        *self.read_group_failure.lock() = Some(failure);
    }

    pub fn set_preview(&self, preview: Result<SharedDataPreview, DataPreviewActionFailure>) {
        *self.preview.lock() = preview;
    }

    pub fn set_removal_outcome(&self, outcome: PeopleGroupActionOutcome) {
        *self.removal_outcome.lock() = outcome;
    }

    pub fn fail_url_creation(&self) {
        *self.url_creation_fails.lock() = true;
    }

    pub fn read_new_group_calls(&self) -> usize {
        self.read_new_group_calls.load(Ordering::SeqCst)
    }

    pub fn read_group_deprecated_calls(&self) -> usize {
        self.read_group_deprecated_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSharingService for FakeDataSharing {
    fn is_group_data_model_loaded(&self) -> bool {
        *self.loaded.lock()
    }

    fn read_group(&self, group_id: &GroupId) -> Option<GroupData> {
        self.groups.lock().get(group_id).cloned()
    }

    async fn read_new_group(
        &self,
        token: &GroupToken,
    ) -> Result<GroupData, PeopleGroupActionFailure> {
        self.read_new_group_calls.fetch_add(1, Ordering::SeqCst);
        let failure = *self.new_group_failure.lock();
        match failure {
            Some(failure) => Err(failure),
            None => Ok(GroupData::from_token(token.clone())),
        }
    }

    async fn read_group_deprecated(
        &self,
        group_id: &GroupId,
    ) -> Result<GroupData, PeopleGroupActionFailure> {
        self.read_group_deprecated_calls
            .fetch_add(1, Ordering::SeqCst);
        let failure = *self.read_group_failure.lock();
        if let Some(failure) = failure {
            return Err(failure);
        }
        let cached = self.groups.lock().get(group_id).cloned();
        Ok(cached.unwrap_or_else(|| {
            GroupData::from_token(GroupToken::new(group_id.clone(), "read-back"))
        }))
    }

    async fn get_shared_entities_preview(
        &self,
        _token: &GroupToken,
    ) -> Result<SharedDataPreview, DataPreviewActionFailure> {
        self.preview.lock().clone()
    }

    async fn delete_group(&self, group_id: &GroupId) -> PeopleGroupActionOutcome {
        self.remove_group(group_id)
    }

    async fn leave_group(&self, group_id: &GroupId) -> PeopleGroupActionOutcome {
        self.remove_group(group_id)
    }

    fn parse_data_sharing_url(&self, url: &Url) -> Result<GroupToken, ParseUrlError> {
        if url.host_str() != Some(INVITATION_HOST) || url.path() != "/join" {
            return Err(ParseUrlError::NotDataSharingUrl(url.to_string()));
        }
        let param = |name: &'static str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .ok_or(ParseUrlError::MissingParameter(name))
        };
        Ok(GroupToken::new(
            GroupId::new(param("group_id")?),
            param("token")?,
        ))
    }

    fn get_data_sharing_url(&self, group: &GroupData) -> Option<Url> {
        if *self.url_creation_fails.lock() {
            return None;
        }
        Some(join_url(&group.group_token))
    }

    fn subscribe(&self) -> broadcast::Receiver<DataSharingEvent> {
        self.tx.subscribe()
    }
}

impl FakeDataSharing {
    fn remove_group(&self, group_id: &GroupId) -> PeopleGroupActionOutcome {
        let outcome = *self.removal_outcome.lock();
        if outcome == PeopleGroupActionOutcome::Success {
            self.groups.lock().remove(group_id);
        }
        outcome
    }
}

// =============================================================================
// Tab group sync store
// =============================================================================

pub struct FakeTabGroupSync {
    initialized: Mutex<bool>,
    groups: Mutex<Vec<SavedTabGroup>>,
    sharing_result: Mutex<TabGroupSharingResult>,
    removed: Mutex<Vec<CollaborationId>>,
    hidden_listings: AtomicUsize,
    tx: broadcast::Sender<TabGroupSyncEvent>,
}

impl FakeTabGroupSync {
    pub fn new(initialized: bool) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            initialized: Mutex::new(initialized),
            groups: Mutex::new(Vec::new()),
            sharing_result: Mutex::new(TabGroupSharingResult::Success),
            removed: Mutex::new(Vec::new()),
            hidden_listings: AtomicUsize::new(0),
            tx,
        }
    }

    /// The next listing comes back empty, as if it raced an incoming sync.
    pub fn hide_next_listing(&self) {
        self.hidden_listings.fetch_add(1, Ordering::SeqCst);
    }

    pub fn finish_initializing(&self) {
        *self.initialized.lock() = true;
        let _ = self.tx.send(TabGroupSyncEvent::Initialized);
    }

    /// Stores `group` without notifying.
    pub fn insert_group(&self, group: SavedTabGroup) {
        self.groups.lock().push(group);
    }

    /// Stores `group` as if it arrived from another device.
    pub fn add_group(&self, group: SavedTabGroup) {
        self.insert_group(group.clone());
        let _ = self.tx.send(TabGroupSyncEvent::TabGroupAdded {
            group,
            source: TriggerSource::Remote,
        });
    }

    pub fn fail_sharing(&self) {
        *self.sharing_result.lock() = TabGroupSharingResult::Failure;
    }

    pub fn groups(&self) -> Vec<SavedTabGroup> {
        self.groups.lock().clone()
    }

    pub fn removed_collaborations(&self) -> Vec<CollaborationId> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl TabGroupSyncService for FakeTabGroupSync {
    fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }

    fn get_all_groups(&self) -> Vec<SavedTabGroup> {
        let hidden = self
            .hidden_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if hidden.is_ok() {
            return Vec::new();
        }
        self.groups.lock().clone()
    }

    fn get_group(&self, id: &EitherGroupId) -> Option<SavedTabGroup> {
        self.groups.lock().iter().find(|group| group.matches(id)).cloned()
    }

    async fn make_tab_group_shared(
        &self,
        local_group_id: LocalTabGroupId,
        collaboration_id: CollaborationId,
    ) -> TabGroupSharingResult {
        let result = *self.sharing_result.lock();
        if result == TabGroupSharingResult::Failure {
            return result;
        }

        let updated = {
            let mut groups = self.groups.lock();
            groups
                .iter_mut()
                .find(|group| group.local_group_id == Some(local_group_id))
                .map(|group| {
                    group.collaboration_id = Some(collaboration_id);
                    group.clone()
                })
        };
        match updated {
            Some(group) => {
                let _ = self.tx.send(TabGroupSyncEvent::TabGroupUpdated {
                    group,
                    source: TriggerSource::Local,
                });
                TabGroupSharingResult::Success
            }
            None => TabGroupSharingResult::Failure,
        }
    }

    fn on_collaboration_removed(&self, collaboration_id: &CollaborationId) {
        self.removed.lock().push(collaboration_id.clone());
    }

    fn subscribe(&self) -> broadcast::Receiver<TabGroupSyncEvent> {
        self.tx.subscribe()
    }
}

// =============================================================================
// Metrics
// =============================================================================

#[derive(Default)]
pub struct RecordingMetrics {
    samples: Mutex<Vec<(&'static str, u32)>>,
}

impl RecordingMetrics {
    pub fn join_count(&self, event: JoinEvent) -> usize {
        self.count(JOIN_FLOW_HISTOGRAM, event as u32)
    }

    pub fn has_join(&self, event: JoinEvent) -> bool {
        self.join_count(event) > 0
    }

    pub fn share_count(&self, event: ShareOrManageEvent) -> usize {
        self.count(SHARE_OR_MANAGE_FLOW_HISTOGRAM, event as u32)
    }

    pub fn has_share(&self, event: ShareOrManageEvent) -> bool {
        self.share_count(event) > 0
    }

    fn count(&self, histogram: &str, sample: u32) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|(name, value)| *name == histogram && *value == sample)
            .count()
    }
}

impl MetricsRecorder for RecordingMetrics {
    fn record_enumeration(&self, histogram: &'static str, sample: u32, exclusive_max: u32) {
        assert!(sample < exclusive_max, "{histogram} sample {sample} out of range");
        self.samples.lock().push((histogram, sample));
    }
}

// =============================================================================
// Delegate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateCall {
    PrepareFlowUi,
    ShowError(ErrorType),
    ShowAuthenticationUi,
    ShowJoinDialog(GroupToken),
    ShowShareDialog(EitherGroupId),
    UrlReadyToShare(GroupId, Url),
    ShowManageDialog(EitherGroupId),
    PromoteTabGroup(GroupId),
    NotifySignInAndSyncStatusChange,
    PromoteCurrentScreen,
    FlowFinished,
}

/// Delegate steps that can be held open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    PrepareFlowUi,
    Authentication,
    JoinDialog,
    ShareDialog,
}

/// What each delegate step resolves to.
#[derive(Debug, Clone)]
pub struct Script {
    pub prepare: Outcome,
    pub error: Outcome,
    pub authentication: Outcome,
    pub join: Outcome,
    pub share: (Outcome, Option<GroupToken>),
    pub url: Outcome,
    pub manage: Outcome,
    pub promote: Outcome,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            prepare: Outcome::Success,
            error: Outcome::Success,
            authentication: Outcome::Success,
            join: Outcome::Success,
            share: (Outcome::Success, None),
            url: Outcome::Success,
            manage: Outcome::Success,
            promote: Outcome::Success,
        }
    }
}

#[derive(Default)]
pub struct RecordingDelegate {
    calls: Mutex<Vec<DelegateCall>>,
    script: Mutex<Script>,
    held: Mutex<HashSet<Step>>,
    released: Notify,
    exit: Mutex<Option<FlowExitHandle>>,
    exit_when_finished: AtomicBool,
    shown_errors: Mutex<Vec<ErrorInfo>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, edit: impl FnOnce(&mut Script)) {
        edit(&mut self.script.lock());
    }

    /// Keeps `step` pending until [`release`](Self::release).
    pub fn hold(&self, step: Step) {
        self.held.lock().insert(step);
    }

    pub fn release(&self, step: Step) {
        self.held.lock().remove(&step);
        self.released.notify_waiters();
    }

    /// Asks for exit again from inside `on_flow_finished`.
    pub fn exit_again_when_finished(&self) {
        self.exit_when_finished.store(true, Ordering::SeqCst);
    }

    /// Ends the flow the way a closing window would.
    pub fn close_ui(&self) {
        if let Some(exit) = self.exit.lock().clone() {
            exit.exit();
        }
    }

    pub fn calls(&self) -> Vec<DelegateCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &DelegateCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn has(&self, call: &DelegateCall) -> bool {
        self.count(call) > 0
    }

    pub fn errors(&self) -> Vec<ErrorType> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DelegateCall::ShowError(error_type) => Some(*error_type),
                _ => None,
            })
            .collect()
    }

    /// Log details of every error shown, in order.
    pub fn error_details(&self) -> Vec<Option<String>> {
        self.shown_errors
            .lock()
            .iter()
            .map(|error| error.detail.clone())
            .collect()
    }

    fn record(&self, call: DelegateCall) {
        self.calls.lock().push(call);
    }

    async fn gate(&self, step: Step) {
        loop {
            let released = self.released.notified();
            if !self.held.lock().contains(&step) {
                return;
            }
            released.await;
        }
    }
}

#[async_trait]
impl CollaborationControllerDelegate for RecordingDelegate {
    async fn prepare_flow_ui(&self, exit: FlowExitHandle) -> Outcome {
        self.record(DelegateCall::PrepareFlowUi);
        *self.exit.lock() = Some(exit);
        self.gate(Step::PrepareFlowUi).await;
        self.script.lock().prepare
    }

    async fn show_error(&self, error: ErrorInfo) -> Outcome {
        self.record(DelegateCall::ShowError(error.error_type));
        self.shown_errors.lock().push(error);
        self.script.lock().error
    }

    async fn show_authentication_ui(&self) -> Outcome {
        self.record(DelegateCall::ShowAuthenticationUi);
        self.gate(Step::Authentication).await;
        self.script.lock().authentication
    }

    async fn show_join_dialog(&self, token: GroupToken, _preview: SharedDataPreview) -> Outcome {
        self.record(DelegateCall::ShowJoinDialog(token));
        self.gate(Step::JoinDialog).await;
        self.script.lock().join
    }

    async fn show_share_dialog(&self, either_id: EitherGroupId) -> (Outcome, Option<GroupToken>) {
        self.record(DelegateCall::ShowShareDialog(either_id));
        self.gate(Step::ShareDialog).await;
        self.script.lock().share.clone()
    }

    async fn on_url_ready_to_share(&self, group_id: GroupId, url: Url) -> Outcome {
        self.record(DelegateCall::UrlReadyToShare(group_id, url));
        self.script.lock().url
    }

    async fn show_manage_dialog(&self, either_id: EitherGroupId) -> Outcome {
        self.record(DelegateCall::ShowManageDialog(either_id));
        self.script.lock().manage
    }

    async fn promote_tab_group(&self, group_id: GroupId) -> Outcome {
        self.record(DelegateCall::PromoteTabGroup(group_id));
        self.script.lock().promote
    }

    fn notify_sign_in_and_sync_status_change(&self) {
        self.record(DelegateCall::NotifySignInAndSyncStatusChange);
    }

    fn promote_current_screen(&self) {
        self.record(DelegateCall::PromoteCurrentScreen);
    }

    fn on_flow_finished(&self) {
        self.record(DelegateCall::FlowFinished);
        if self.exit_when_finished.load(Ordering::SeqCst) {
            self.close_ui();
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Fakes behind a service under test.
pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub sync: Arc<FakeSync>,
    pub data_sharing: Arc<FakeDataSharing>,
    pub tab_group_sync: Arc<FakeTabGroupSync>,
    pub metrics: Arc<RecordingMetrics>,
}

impl Harness {
    /// Signed in, syncing, both stores ready.
    pub fn new() -> Self {
        Self::with(FakeIdentity::signed_in("me@gmail.com"), FakeSync::syncing(), true)
    }

    /// Signed in and syncing, but neither store has finished loading.
    pub fn with_stores_loading() -> Self {
        Self::with(FakeIdentity::signed_in("me@gmail.com"), FakeSync::syncing(), false)
    }

    pub fn with(identity: FakeIdentity, sync: FakeSync, stores_ready: bool) -> Self {
        init_tracing();
        Self {
            identity: Arc::new(identity),
            sync: Arc::new(sync),
            data_sharing: Arc::new(FakeDataSharing::new(stores_ready)),
            tab_group_sync: Arc::new(FakeTabGroupSync::new(stores_ready)),
            metrics: Arc::new(RecordingMetrics::default()),
        }
    }

    pub fn service(&self) -> CollaborationService {
        self.service_with(CollaborationConfig::default())
    }

    pub fn service_with(&self, config: CollaborationConfig) -> CollaborationService {
        CollaborationService::new(
            config,
            self.data_sharing.clone(),
            self.tab_group_sync.clone(),
            self.identity.clone(),
            self.sync.clone(),
            self.metrics.clone(),
        )
    }

    /// Adds an unshared local tab group and returns its id.
    pub fn local_tab_group(&self) -> EitherGroupId {
        let local_id = LocalTabGroupId::new();
        self.tab_group_sync
            .insert_group(SavedTabGroup::new("Trip").with_local_id(local_id));
        EitherGroupId::Local(local_id)
    }
}

pub fn start_join(
    service: &CollaborationService,
    delegate: &Arc<RecordingDelegate>,
    token: &GroupToken,
) -> ControllerHandle {
    service.start_join_flow(delegate.clone(), &join_url(token));
    service.join_flow(token).expect("join flow registered")
}

pub fn start_share(
    service: &CollaborationService,
    delegate: &Arc<RecordingDelegate>,
    either_id: EitherGroupId,
) -> ControllerHandle {
    service.start_share_or_manage_flow(delegate.clone(), either_id);
    service.share_flow(&either_id).expect("share flow registered")
}
