//! Collaboration service configuration.

use std::path::Path;
use std::time::Duration;

use collab_protocol::UserSelectableType;
use serde::{Deserialize, Serialize};

use crate::{Result, timeouts};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollaborationConfig {
    /// Feature and policy switches.
    #[serde(default)]
    pub features: FeatureConfig,

    /// Timeouts of the waiting states.
    #[serde(default)]
    pub timeouts: FlowTimeouts,
}

impl CollaborationConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }
}

/// Feature flags and device policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    /// Creating and joining shared groups is enabled.
    #[serde(default = "default_true")]
    pub data_sharing: bool,

    /// Only joining is enabled. Ignored when `data_sharing` is set.
    #[serde(default)]
    pub join_only: bool,

    /// Device policy allows signing in.
    #[serde(default = "default_true")]
    pub signin_allowed: bool,

    /// Sign-in promos replace sync promos, so sync-the-feature is not
    /// required to collaborate.
    #[serde(default)]
    pub replace_sync_promos_with_signin_promos: bool,

    /// Data type that must be synced. Mobile platforms sync tab groups as
    /// part of `tabs`.
    #[serde(default = "default_required_sync_type")]
    pub required_sync_type: UserSelectableType,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            data_sharing: true,
            join_only: false,
            signin_allowed: true,
            replace_sync_promos_with_signin_promos: false,
            required_sync_type: default_required_sync_type(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_required_sync_type() -> UserSelectableType {
    UserSelectableType::SavedTabGroups
}

/// Timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowTimeouts {
    #[serde(default = "default_services_ready_ms")]
    pub services_ready_ms: u64,

    #[serde(default = "default_sync_and_people_group_ms")]
    pub sync_and_people_group_ms: u64,

    #[serde(default = "default_authentication_ms")]
    pub authentication_ms: u64,
}

impl FlowTimeouts {
    pub fn services_ready(&self) -> Duration {
        Duration::from_millis(self.services_ready_ms)
    }

    pub fn sync_and_people_group(&self) -> Duration {
        Duration::from_millis(self.sync_and_people_group_ms)
    }

    pub fn authentication(&self) -> Duration {
        Duration::from_millis(self.authentication_ms)
    }
}

impl Default for FlowTimeouts {
    fn default() -> Self {
        Self {
            services_ready_ms: timeouts::DEFAULT_SERVICES_READY_MS,
            sync_and_people_group_ms: timeouts::DEFAULT_SYNC_AND_PEOPLE_GROUP_MS,
            authentication_ms: timeouts::DEFAULT_AUTHENTICATION_MS,
        }
    }
}

fn default_services_ready_ms() -> u64 {
    timeouts::DEFAULT_SERVICES_READY_MS
}

fn default_sync_and_people_group_ms() -> u64 {
    timeouts::DEFAULT_SYNC_AND_PEOPLE_GROUP_MS
}

fn default_authentication_ms() -> u64 {
    timeouts::DEFAULT_AUTHENTICATION_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollabError;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CollaborationConfig::from_toml_str("").unwrap();
        assert_eq!(config, CollaborationConfig::default());
        assert_eq!(config.timeouts.services_ready(), Duration::from_secs(5));
        assert_eq!(config.timeouts.sync_and_people_group(), Duration::from_secs(20));
        assert_eq!(config.timeouts.authentication(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_partial_config() {
        let config = CollaborationConfig::from_toml_str(
            r#"
            [features]
            data_sharing = false
            join_only = true
            required_sync_type = "tabs"

            [timeouts]
            services_ready_ms = 250
            "#,
        )
        .unwrap();

        assert!(!config.features.data_sharing);
        assert!(config.features.join_only);
        assert!(config.features.signin_allowed);
        assert_eq!(config.features.required_sync_type, UserSelectableType::Tabs);
        assert_eq!(config.timeouts.services_ready_ms, 250);
        assert_eq!(
            config.timeouts.sync_and_people_group_ms,
            timeouts::DEFAULT_SYNC_AND_PEOPLE_GROUP_MS
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = CollaborationConfig::from_toml_str("[features]\nshare_everything = true\n");
        assert!(matches!(result, Err(CollabError::ConfigParse(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collaboration.toml");
        tokio::fs::write(&path, "[features]\nsignin_allowed = false\n")
            .await
            .unwrap();

        let config = CollaborationConfig::load(&path).await.unwrap();
        assert!(!config.features.signin_allowed);

        let missing = CollaborationConfig::load(&dir.path().join("missing.toml")).await;
        assert!(matches!(missing, Err(CollabError::ConfigIo(_))));
    }
}
