use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed failure log {path}: {source}")]
    MalformedLog {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Slack API {method} failed: {error}")]
    SlackApi { method: String, error: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed_log(path: &str, source: serde_json::Error) -> Self {
        Self::MalformedLog {
            path: path.to_string(),
            source,
        }
    }

    pub fn slack_api(method: &str, error: impl Into<String>) -> Self {
        Self::SlackApi {
            method: method.to_string(),
            error: error.into(),
        }
    }

    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Configuration problems are reported before any work starts
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Validation { .. })
    }

    /// True when the token or channel input is the problem
    pub fn is_credential_error(&self) -> bool {
        matches!(self, AppError::Validation { field, .. } if field == "token" || field == "channel")
    }
}
