//! Error types surfaced by [`crate::CalDavClient`].
//!
//! Plumbing (transport, XML) works with [`anyhow::Result`]; the orchestrator maps
//! everything a caller may need to branch on into [`CalDavError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalDavError {
    /// `PUT` with `If-None-Match: *` was rejected because the resource exists.
    #[error("event {uid} already exists")]
    AlreadyExists { uid: String },

    /// Optimistic-concurrency failure: the server copy changed since `local_etag` was read.
    #[error("etag conflict (local: {}, remote: {})", .local_etag.as_deref().unwrap_or("none"), .remote_etag.as_deref().unwrap_or("none"))]
    Conflict {
        local_etag: Option<String>,
        remote_etag: Option<String>,
    },

    /// The call deadline fired before the server answered.
    #[error("request cancelled by deadline")]
    Timeout,

    #[error("{operation} failed: {status} {status_text}")]
    RequestFailed {
        operation: &'static str,
        status: u16,
        status_text: String,
    },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] hyper::header::InvalidHeaderValue),

    #[error(transparent)]
    Transport(anyhow::Error),
}

impl CalDavError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Recover a typed error that travelled through an `anyhow` pipeline.
    pub(crate) fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<CalDavError>() {
            Ok(typed) => typed,
            Err(other) => Self::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CalDavError>;
