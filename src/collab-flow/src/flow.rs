//! Flow descriptor.

use collab_protocol::{EitherGroupId, FlowType, GroupToken};

/// What a controller is doing: joining a group from a token, or sharing /
/// managing a local tab group.
///
/// Accessors assert the flow type; reading the join token of a share flow
/// (or the group id of a join flow) is a programming error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Join {
        token: GroupToken,
    },
    ShareOrManage {
        either_id: EitherGroupId,
        /// Token of the group created by the share dialog.
        share_token: Option<GroupToken>,
    },
}

impl Flow {
    pub fn join(token: GroupToken) -> Self {
        Self::Join { token }
    }

    pub fn share_or_manage(either_id: EitherGroupId) -> Self {
        Self::ShareOrManage {
            either_id,
            share_token: None,
        }
    }

    pub fn flow_type(&self) -> FlowType {
        match self {
            Self::Join { .. } => FlowType::Join,
            Self::ShareOrManage { .. } => FlowType::ShareOrManage,
        }
    }

    pub fn join_token(&self) -> &GroupToken {
        match self {
            Self::Join { token } => token,
            Self::ShareOrManage { .. } => panic!("join token read on a {} flow", self.flow_type()),
        }
    }

    pub fn either_id(&self) -> EitherGroupId {
        match self {
            Self::ShareOrManage { either_id, .. } => *either_id,
            Self::Join { .. } => panic!("group id read on a {} flow", self.flow_type()),
        }
    }

    /// Token of the group created by the share dialog. Always `None` for
    /// joins.
    pub fn share_token(&self) -> Option<&GroupToken> {
        match self {
            Self::ShareOrManage { share_token, .. } => share_token.as_ref(),
            Self::Join { .. } => None,
        }
    }

    pub fn set_share_token(&mut self, token: GroupToken) {
        match self {
            Self::ShareOrManage { share_token, .. } => *share_token = Some(token),
            Self::Join { .. } => panic!("share token set on a join flow"),
        }
    }
}
