//! Error types for the dashboard render cycle
//!
//! Errors are classified by where they stop the cycle:
//! - Fetch: the source feed could not be read (network, decode)
//! - Schema: the feed does not carry the columns the views need
//! - Authentication: identity/secret mismatch
//! - Configuration: config or credential artifact problems, local IO

use thiserror::Error;

/// Error types for loading, authenticating and rendering
#[derive(Debug, Error)]
pub enum DashboardError {
    // Fetch errors
    #[error("Failed to fetch source feed: {0}")]
    Fetch(String),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    // Schema errors
    #[error("Insufficient columns: found {found}, need at least {required}")]
    InsufficientColumns { found: usize, required: usize },

    #[error("Schema mismatch: column '{0}' not found in feed header")]
    SchemaMismatch(String),

    // Authentication
    #[error("Invalid username or password")]
    AuthenticationFailed,

    // Local configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Fetch,
    Schema,
    Authentication,
    Configuration,
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::Fetch(_) | DashboardError::Http(_) | DashboardError::Csv(_) => {
                ErrorKind::Fetch
            }
            DashboardError::InsufficientColumns { .. } | DashboardError::SchemaMismatch(_) => {
                ErrorKind::Schema
            }
            DashboardError::AuthenticationFailed => ErrorKind::Authentication,
            DashboardError::Configuration(_)
            | DashboardError::Io(_)
            | DashboardError::Json(_) => ErrorKind::Configuration,
        }
    }

    /// Returns true if a refresh may clear this error
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Fetch
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DashboardError::Fetch(_) | DashboardError::Http(_) => {
                "Check your connection and run 'refresh'."
            }
            DashboardError::Csv(_) => "The export could not be decoded. Try 'refresh' later.",
            DashboardError::InsufficientColumns { .. } => {
                "The sheet has fewer columns than expected. Ask the sheet owner to restore them."
            }
            DashboardError::SchemaMismatch(_) => {
                "Check the 'columns' overrides in ~/.visitboard/config.json"
            }
            DashboardError::AuthenticationFailed => "Check your username and password.",
            DashboardError::Configuration(_) => "Check ~/.visitboard/config.json",
            DashboardError::Io(_) => "Check file permissions and paths.",
            DashboardError::Json(_) => "Check the file is valid JSON.",
        }
    }
}

/// Serializable error representation for display
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFacingError {
    pub message: String,
    pub kind: ErrorKind,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

impl From<&DashboardError> for UserFacingError {
    fn from(err: &DashboardError) -> Self {
        UserFacingError {
            message: err.to_string(),
            kind: err.kind(),
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
