//! Bearer-token session state.

use parking_lot::RwLock;
use tracing::debug;

/// Holds the access token for the signed-in user.
///
/// Shared behind an `Arc` between the API client and whatever owns the
/// sign-in flow. Invalidation is one-way: once cleared, every
/// authorized request fails with `Unauthenticated` until a new token
/// is stored.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the token issued at sign-in, replacing any previous one.
    pub fn authenticate(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
        debug!("Session authenticated");
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Drop the token. Called on sign-out and whenever the server
    /// rejects the token with a 401.
    pub fn invalidate(&self) {
        *self.token.write() = None;
        debug!("Session invalidated");
    }
}
