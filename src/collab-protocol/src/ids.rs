//! Identifiers shared by the people-group store and the tab group sync store.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a people group in the data sharing backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Credential used to join a people group: the group id plus the opaque
/// access token carried by an invitation link.
///
/// The default token is empty and therefore invalid. Unparseable join links
/// produce it so that the flow can report the problem to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupToken {
    pub group_id: GroupId,
    pub access_token: String,
}

impl GroupToken {
    pub fn new(group_id: GroupId, access_token: impl Into<String>) -> Self {
        Self {
            group_id,
            access_token: access_token.into(),
        }
    }

    /// A token is usable only when both halves are present.
    pub fn is_valid(&self) -> bool {
        !self.group_id.is_empty() && !self.access_token.is_empty()
    }
}

/// Collaboration id stored on a shared tab group. Mirrors the people
/// group id it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollaborationId(String);

impl CollaborationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&GroupId> for CollaborationId {
    fn from(group_id: &GroupId) -> Self {
        Self(group_id.as_str().to_string())
    }
}

impl PartialEq<GroupId> for CollaborationId {
    fn eq(&self, other: &GroupId) -> bool {
        self.0 == other.as_str()
    }
}

impl fmt::Display for CollaborationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a tab group that is open in a local window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalTabGroupId(Uuid);

impl LocalTabGroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LocalTabGroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalTabGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a tab group in the sync store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncGroupId(Uuid);

impl SyncGroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SyncGroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a local-only tab group id or a synced one. Share and manage
/// flows are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EitherGroupId {
    Local(LocalTabGroupId),
    Sync(SyncGroupId),
}

impl From<LocalTabGroupId> for EitherGroupId {
    fn from(id: LocalTabGroupId) -> Self {
        Self::Local(id)
    }
}

impl From<SyncGroupId> for EitherGroupId {
    fn from(id: SyncGroupId) -> Self {
        Self::Sync(id)
    }
}

impl fmt::Display for EitherGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EitherGroupId::Local(id) => write!(f, "local:{}", id),
            EitherGroupId::Sync(id) => write!(f, "sync:{}", id),
        }
    }
}
