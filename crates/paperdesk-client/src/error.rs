//! Client error types.
//!
//! Auth failures are split into two distinct conditions the UI treats
//! differently: `Unauthenticated` (no token was ever attached, send the
//! user to sign-in) and `SessionExpired` (a token was attached and the
//! server rejected it, the session has been invalidated). Neither is
//! ever folded into a transport error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A request that needs a token was made without one.
    #[error("You are not authenticated.")]
    Unauthenticated,

    /// The server rejected the attached token. The session has already
    /// been invalidated; the caller must re-authenticate, the request
    /// is never retried.
    #[error("Session expired. Please sign in again.")]
    SessionExpired,

    /// Non-success response with a parsed error message, reported
    /// verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// True for both auth conditions.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired)
    }

    /// HTTP status associated with this error, where one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated | Self::SessionExpired => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
