use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of a page fetch, normalized at the client boundary.
///
/// `InvalidQuery` signals caller misuse and is the only variant surfaced
/// synchronously; the other two are runtime conditions folded into
/// [`crate::FetchState`] rather than propagated.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid page query: {reason}")]
    InvalidQuery { reason: String },
    #[error("transport failure: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
    #[error("page body did not match the expected shape: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidQuery { .. } => FetchErrorKind::InvalidQuery,
            FetchError::Transport { .. } => FetchErrorKind::Transport,
            FetchError::Decode { .. } => FetchErrorKind::Decode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    InvalidQuery,
    Transport,
    Decode,
}

/// Cloneable record of a failed fetch, carried inside state snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&FetchError> for FetchFailure {
    fn from(err: &FetchError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
