//! Error carried into the error state and shown to the user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason a flow ended in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Placeholder used for transitions that carry no error.
    #[default]
    Unknown,
    GenericError,
    /// Malformed join link, invalid invitation, or a share link that
    /// could not be built.
    InvalidUrl,
    SigninDisabledByPolicy,
    SyncDisabledByPolicy,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Unknown => "Unknown",
            ErrorType::GenericError => "GenericError",
            ErrorType::InvalidUrl => "InvalidUrl",
            ErrorType::SigninDisabledByPolicy => "SigninDisabledByPolicy",
            ErrorType::SyncDisabledByPolicy => "SyncDisabledByPolicy",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error information passed along a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub error_type: ErrorType,
    /// Extra context for logs; never replaces the type shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorInfo {
    pub fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// No error; the default for ordinary transitions.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_error(&self) -> bool {
        self.error_type != ErrorType::Unknown
    }

    /// Compact form used in transition logs.
    pub fn log_string(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {}", self.error_type, detail),
            None => self.error_type.to_string(),
        }
    }
}

impl From<ErrorType> for ErrorInfo {
    fn from(error_type: ErrorType) -> Self {
        Self::new(error_type)
    }
}
