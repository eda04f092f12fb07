// Error handling module
// Defines the credential error taxonomy and API operation errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Credential lifecycle errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credential file yet
    #[error("no credential file at {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but is unreadable or incomplete
    #[error("credential file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// No credential loaded in memory
    #[error("not authenticated: no credential loaded")]
    Unauthenticated,

    /// Refresh attempted without a refresh token
    #[error("cannot refresh: refresh token is empty")]
    InvalidState,

    /// Refresh exchange rejected or returned unusable tokens
    #[error("token refresh failed, re-authentication required: {0:#}")]
    RefreshFailed(#[source] anyhow::Error),

    /// Refresh succeeded but the result could not be written back
    #[error("token refreshed but could not be saved to {}: {source}", .path.display())]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Store read/write failure unrelated to content
    #[error("credential store I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AuthError {
    /// True when the user has to run the interactive login again
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound(_)
                | AuthError::Corrupt { .. }
                | AuthError::Unauthenticated
                | AuthError::InvalidState
                | AuthError::RefreshFailed(_)
        )
    }
}

/// Errors from authenticated API operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// Could not obtain a valid access token
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Non-success response from the platform
    #[error("Xiaoyuzhou API error: {status} - {message}")]
    Upstream { status: u16, message: String },

    /// Request validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport or decoding failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn requires_reauth(&self) -> bool {
        match self {
            ApiError::Auth(e) => e.requires_reauth(),
            ApiError::Upstream { status, .. } => *status == 401,
            _ => false,
        }
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
