//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Coarse failure class used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential or bad settings. Nothing was sent.
    Configuration,
    /// The provider ran the task and it did not produce a video.
    TaskFailure,
    /// The provider could not be reached or rejected the request.
    Transport,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider misconfigured: {0}")]
    Configuration(String),

    #[error("Task {task_id} failed: {detail}")]
    TaskFailed { task_id: String, detail: String },

    #[error("Task {0} succeeded without a video URL")]
    MissingOutput(String),

    #[error("Provider rejected credentials ({status})")]
    Unauthorized { status: u16 },

    #[error("Rate limited by provider")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Provider server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Provider rejected request {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProviderError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            429 => Self::RateLimited { retry_after_ms },
            500..=599 => Self::Server {
                status,
                body: body.into(),
            },
            _ => Self::Rejected {
                status,
                body: body.into(),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::TaskFailed { .. } | Self::MissingOutput(_) => ErrorKind::TaskFailure,
            Self::Unauthorized { .. }
            | Self::RateLimited { .. }
            | Self::Server { .. }
            | Self::Rejected { .. }
            | Self::InvalidResponse(_)
            | Self::Network(_) => ErrorKind::Transport,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Server { .. } => true,
            Self::Network(e) => !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}
