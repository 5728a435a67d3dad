//! Collaboration flow orchestration.
//!
//! This crate drives a user through joining a shared tab group from an
//! invitation link, or sharing/managing a tab group they already have:
//! - Flow lifecycle and deduplication per target group
//! - A per-state handler state machine with a checked transition table
//! - Waits on sign-in, policy, and two eventually-consistent backends
//! - Timeouts and cancellation at every step
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CollaborationService                       │
//! │  ┌─────────────────────┐  ┌─────────────────────────────┐   │
//! │  │ join: GroupToken →  │  │ share: EitherGroupId →      │   │
//! │  │   ControllerHandle  │  │   ControllerHandle          │   │
//! │  └─────────────────────┘  └─────────────────────────────┘   │
//! │  StatusTracker (signin / sync / collaboration snapshot)      │
//! └───────────────────────────┬─────────────────────────────────┘
//!                             │ spawn
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               CollaborationController (actor)                │
//! │  events: mpsc ──▶ current: Box<dyn ControllerState>          │
//! │  epoch-tagged results from delegate, stores, timers          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use collab_flow::{CollaborationConfig, CollaborationService};
//!
//! let service = CollaborationService::new(
//!     CollaborationConfig::default(),
//!     data_sharing,
//!     tab_group_sync,
//!     identity,
//!     sync,
//!     metrics,
//! );
//!
//! // Join from an invitation link.
//! service.start_join_flow(Arc::new(MyDelegate::new()), &url);
//! ```

pub mod collaborators;
pub mod config;
pub mod controller;
pub mod delegate;
pub mod flow;
pub mod metrics;
pub mod service;
pub mod state;
pub mod status;

pub use collaborators::Collaborators;
pub use config::{CollaborationConfig, FeatureConfig, FlowTimeouts};
pub use controller::{CollaborationController, ControllerHandle, FinishCallback, FlowId};
pub use delegate::{CollaborationControllerDelegate, FlowExitHandle};
pub use flow::Flow;
pub use metrics::{JoinEvent, NoopMetricsRecorder, ShareOrManageEvent, TracingMetricsRecorder};
pub use service::CollaborationService;
pub use state::{StateId, is_valid_state_transition};
pub use status::StatusTracker;

use collab_protocol::{GroupId, PeopleGroupActionOutcome};
use thiserror::Error;

/// Log target for every record emitted by this crate.
pub const LOG_TARGET: &str = "collaboration";

/// Errors for the collaboration service.
#[derive(Debug, Error)]
pub enum CollabError {
    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Config text is not valid.
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Deleting or leaving a people group failed.
    #[error("Removing group {group_id} failed: {outcome:?}")]
    GroupRemovalFailed {
        group_id: GroupId,
        outcome: PeopleGroupActionOutcome,
    },
}

pub type Result<T> = std::result::Result<T, CollabError>;

/// Default timeouts for the waiting states.
pub mod timeouts {
    /// Backends must report readiness within 5 seconds.
    pub const DEFAULT_SERVICES_READY_MS: u64 = 5_000;

    /// Joined tab group and people group must both land within 20 seconds.
    pub const DEFAULT_SYNC_AND_PEOPLE_GROUP_MS: u64 = 20_000;

    /// Out-of-band sign-in completion is awaited for 30 minutes.
    pub const DEFAULT_AUTHENTICATION_MS: u64 = 30 * 60 * 1_000;
}
