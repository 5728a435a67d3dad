//! Flow kinds and the outcome reported by every user-facing step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which collaboration flow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// Join a group from an invitation link.
    Join,
    /// Share a local tab group, or manage one that is already shared.
    ShareOrManage,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowType::Join => write!(f, "Join"),
            FlowType::ShareOrManage => write!(f, "ShareOrManage"),
        }
    }
}

/// Result of a delegate step (dialog, sign-in, promotion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    /// The user backed out. Not an error.
    Cancel,
}
