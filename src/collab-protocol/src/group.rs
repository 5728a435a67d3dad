//! People group records held by the data sharing backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::ids::GroupToken;

/// Role of a member inside a people group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    #[default]
    Unknown,
    Owner,
    Member,
    Invitee,
    FormerMember,
}

/// A member of a people group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub gaia_id: String,
    pub display_name: String,
    pub email: String,
    pub role: MemberRole,
}

/// Roster record of a people group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupData {
    pub group_token: GroupToken,
    pub display_name: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

impl GroupData {
    /// Minimal record carrying only the token; enough to build a share link.
    pub fn from_token(group_token: GroupToken) -> Self {
        Self {
            group_token,
            ..Default::default()
        }
    }

    pub fn member(&self, gaia_id: &str) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.gaia_id == gaia_id)
    }
}

/// A tab shown in the join preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabPreview {
    pub url: Url,
}

/// Preview of the shared tab group behind an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SharedTabGroupPreview {
    pub title: String,
    #[serde(default)]
    pub tabs: Vec<TabPreview>,
}

/// Preview of every entity shared through a group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SharedDataPreview {
    pub shared_tab_group_preview: Option<SharedTabGroupPreview>,
}

/// Why a shared entities preview could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum DataPreviewActionFailure {
    #[error("permission denied")]
    PermissionDenied,
    #[error("group is full")]
    GroupFull,
    #[error("group closed by organization policy")]
    GroupClosedByOrganizationPolicy,
    #[error("preview failed")]
    OtherFailure,
}

/// Why a people group read or mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PeopleGroupActionFailure {
    #[error("unknown failure")]
    Unknown,
    #[error("transient failure")]
    TransientFailure,
    #[error("persistent failure")]
    PersistentFailure,
}

/// Outcome of a people group mutation such as delete or leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeopleGroupActionOutcome {
    Unknown,
    Success,
    TransientFailure,
    PersistentFailure,
}

/// Why an invitation link could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseUrlError {
    #[error("not a data sharing url: {0}")]
    NotDataSharingUrl(String),
    #[error("missing query parameter: {0}")]
    MissingParameter(&'static str),
}
