use serde::Serialize;
use thiserror::Error;

pub type PortalResult<T> = Result<T, PortalError>;

/// A single schema violation, located by a JSON-path-like field name
/// (e.g. `filterTree.conditions[1].value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Account domain is not allowed to access the admin portal")]
    Forbidden,

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Cannot {action} a campaign in status '{from}'")]
    InvalidTransition { from: String, action: String },

    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The notification engine answered with a non-success status. The body is
    /// forwarded to the caller untouched.
    #[error("Notification engine returned HTTP {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Notification engine unreachable: {0}")]
    UpstreamUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        PortalError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(from: impl ToString, action: impl Into<String>) -> Self {
        PortalError::InvalidTransition {
            from: from.to_string(),
            action: action.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PortalError::Validation(vec![FieldError::new(field, message)])
    }

    /// Stable machine-readable code surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Unauthorized => "unauthorized",
            PortalError::Forbidden => "forbidden",
            PortalError::NotFound { .. } => "not_found",
            PortalError::InvalidTransition { .. } => "invalid_transition",
            PortalError::VersionConflict { .. } => "version_conflict",
            PortalError::Validation(_) => "validation_failed",
            PortalError::Upstream { .. } | PortalError::UpstreamUnavailable(_) => {
                "upstream_failure"
            }
            PortalError::Serialization(_) | PortalError::Internal(_) => "internal",
        }
    }

    /// HTTP status the API boundary answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            PortalError::Unauthorized => 401,
            PortalError::Forbidden => 403,
            PortalError::NotFound { .. } => 404,
            PortalError::InvalidTransition { .. } | PortalError::VersionConflict { .. } => 409,
            PortalError::Validation(_) => 400,
            PortalError::Upstream { status, .. } => *status,
            PortalError::UpstreamUnavailable(_) => 502,
            PortalError::Serialization(_) | PortalError::Internal(_) => 500,
        }
    }
}
