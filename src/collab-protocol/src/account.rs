//! Primary account and sync settings as seen by the collaboration service.

use serde::{Deserialize, Serialize};

/// Core info of the signed-in primary account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_id: String,
    pub gaia_id: String,
    pub email: String,
}

impl AccountInfo {
    pub fn is_empty(&self) -> bool {
        self.account_id.is_empty() && self.gaia_id.is_empty() && self.email.is_empty()
    }
}

/// Result of resolving whether the primary account is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedStatus {
    /// Lookup still in flight.
    Pending,
    Error,
    Timeout,
    EnterpriseGoogleDotCom,
    Enterprise,
    ConsumerGmail,
    ConsumerWellKnown,
    ConsumerNotWellKnown,
}

/// Data types the user can choose to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSelectableType {
    Bookmarks,
    History,
    Passwords,
    SavedTabGroups,
    Tabs,
}

const CONSUMER_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "outlook.com",
    "yahoo.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "mail.ru",
    "yandex.ru",
    "qq.com",
    "163.com",
];

/// Cheap pre-check: accounts on well-known consumer domains can never be
/// enterprise accounts, so the managed status lookup can be skipped.
pub fn may_be_enterprise_user_based_on_email(email: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return true;
    };
    let domain = domain.to_ascii_lowercase();
    !CONSUMER_DOMAINS.contains(&domain.as_str())
}
