use std::fmt;

use thiserror::Error;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => f.write_str("context canceled"),
            Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Outcome error returned by cluster-facing collaborators.
///
/// `Canceled` is the only variant that maps to the Canceled step status;
/// every other variant is an ordinary failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Canceled(CancelReason),

    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    #[error("invalid primary cluster \"{0}\"")]
    InvalidPrimary(String),

    #[error("{program} {args} failed: {stderr}")]
    Command {
        program: String,
        args: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
