//! Services shared by every flow.

use std::sync::Arc;

use collab_protocol::{
    CollaborationId, DataSharingService, GroupData, GroupId, IdentityManager, MemberRole,
    MetricsRecorder, TabGroupSyncService,
};

use crate::config::FlowTimeouts;
use crate::status::StatusTracker;

/// Bundle of collaborators handed to each controller.
///
/// Cloning is cheap; all members are shared.
#[derive(Clone)]
pub struct Collaborators {
    pub status: Arc<StatusTracker>,
    pub data_sharing: Arc<dyn DataSharingService>,
    pub tab_group_sync: Arc<dyn TabGroupSyncService>,
    pub identity: Arc<dyn IdentityManager>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub timeouts: FlowTimeouts,
}

impl Collaborators {
    /// Cached people group, if the store knows it.
    pub fn group_data(&self, group_id: &GroupId) -> Option<GroupData> {
        self.data_sharing.read_group(group_id)
    }

    /// Role of the primary account in `group_id`; `Unknown` when the group
    /// or the account is not known, or the account is not a member.
    pub fn current_user_role_for_group(&self, group_id: &GroupId) -> MemberRole {
        let Some(group) = self.data_sharing.read_group(group_id) else {
            return MemberRole::Unknown;
        };
        if group.members.is_empty() {
            return MemberRole::Unknown;
        }
        let Some(account) = self.identity.primary_account() else {
            return MemberRole::Unknown;
        };
        group
            .member(&account.gaia_id)
            .map(|member| member.role)
            .unwrap_or(MemberRole::Unknown)
    }

    /// Whether the tab group sync store has a tab group shared with
    /// `group_id`.
    pub fn is_tab_group_in_sync(&self, group_id: &GroupId) -> bool {
        let collaboration_id = CollaborationId::from(group_id);
        self.tab_group_sync
            .get_all_groups()
            .iter()
            .any(|group| group.collaboration_id.as_ref() == Some(&collaboration_id))
    }

    /// Whether the current user has a role in the people group.
    pub fn is_people_group_in_data_sharing(&self, group_id: &GroupId) -> bool {
        self.current_user_role_for_group(group_id) != MemberRole::Unknown
    }
}
