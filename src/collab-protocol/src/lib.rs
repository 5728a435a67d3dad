//! Collaboration protocol - data model and service boundaries.
//!
//! This crate defines the plain data exchanged by a collaboration flow
//! (group tokens, tab group ids, service status, error info) and the traits
//! of the services the flow orchestrator coordinates:
//!
//! - [`DataSharingService`]: the people group (membership) store
//! - [`TabGroupSyncService`]: the tab group sync store
//! - [`IdentityManager`] and [`SyncService`]: inputs of the service status
//! - [`MetricsRecorder`]: the metrics sink

pub mod account;
pub mod error_info;
pub mod group;
pub mod ids;
pub mod outcome;
pub mod services;
pub mod status;
pub mod tab_group;

// Re-exports
pub use account::{AccountInfo, ManagedStatus, UserSelectableType, may_be_enterprise_user_based_on_email};
pub use error_info::{ErrorInfo, ErrorType};
pub use group::{
    DataPreviewActionFailure, GroupData, GroupMember, MemberRole, ParseUrlError,
    PeopleGroupActionFailure, PeopleGroupActionOutcome, SharedDataPreview, SharedTabGroupPreview,
    TabPreview,
};
pub use ids::{CollaborationId, EitherGroupId, GroupId, GroupToken, LocalTabGroupId, SyncGroupId};
pub use outcome::{FlowType, Outcome};
pub use services::{
    DataSharingEvent, DataSharingService, IdentityEvent, IdentityManager, MetricsRecorder,
    SyncEvent, SyncService, TabGroupSyncEvent, TabGroupSyncService,
};
pub use status::{
    CollaborationStatus, ServiceStatus, ServiceStatusUpdate, SigninStatus, SyncStatus,
};
pub use tab_group::{SavedTabGroup, TabGroupSharingResult, TriggerSource};
