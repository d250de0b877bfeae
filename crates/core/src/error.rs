use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy for the overview path. Validation and not-found are
/// caller-visible with a stable machine-readable code; dependency failures
/// stay generic toward the caller and carry the cause for logging.
#[derive(Debug, Error)]
pub enum OverviewError {
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    #[error("workspace {0} not found")]
    WorkspaceNotFound(Uuid),

    #[error("storage query failed")]
    Dependency(#[from] sqlx::Error),
}

impl OverviewError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    /// Stable error code surfaced in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => code,
            Self::WorkspaceNotFound(_) => "workspace_not_found",
            Self::Dependency(_) => "internal_error",
        }
    }
}
