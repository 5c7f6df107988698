//! Users, tiers and bearer-token sessions.
//!
//! The registry is in-memory and demo-grade on purpose: passwords are
//! stored verbatim and tokens never expire. Everything else about the
//! auth surface (status codes, detail strings, the tier gate) matches
//! what the clients are written against.

use std::collections::HashMap;
use std::fmt;

use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use parking_lot::RwLock;
use paperdesk_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Account capability tier. Short selling requires `Intermediate` or
/// above; ordering follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Beginner => "BEGINNER",
            Tier::Intermediate => "INTERMEDIATE",
            Tier::Advanced => "ADVANCED",
        }
    }

    /// Parse a tier name, `None` for anything unrecognized.
    pub fn parse(name: &str) -> Option<Tier> {
        match name {
            "BEGINNER" => Some(Tier::Beginner),
            "INTERMEDIATE" => Some(Tier::Intermediate),
            "ADVANCED" => Some(Tier::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub tier: Tier,
    pub is_admin: bool,
    password: String,
}

/// Profile body served by `/auth/me`, `/auth/register` and the admin
/// user listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub tier: Tier,
    pub cash_balance: Decimal,
    pub is_admin: bool,
}

impl UserProfile {
    pub fn new(record: &UserRecord, cash_balance: Decimal) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            email: record.email.clone(),
            tier: record.tier,
            cash_balance,
            is_admin: record.is_admin,
        }
    }
}

/// In-memory user registry keyed by username.
pub struct UserRegistry {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Create a user at the starting tier. Username and email must both
    /// be unused.
    pub fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<UserRecord> {
        let mut users = self.users.write();
        if users.contains_key(username) {
            return Err(ApiError::BadRequest("username already exists".to_string()));
        }
        if users.values().any(|u| u.email == email) {
            return Err(ApiError::BadRequest("email already exists".to_string()));
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            tier: Tier::Beginner,
            is_admin: false,
            password: password.to_string(),
        };
        users.insert(username.to_string(), record.clone());
        info!("Registered user {}", username);
        Ok(record)
    }

    /// Username/password check. `None` covers both unknown users and
    /// wrong passwords so callers cannot tell the two apart.
    pub fn verify(&self, username: &str, password: &str) -> Option<UserRecord> {
        self.users
            .read()
            .get(username)
            .filter(|u| u.password == password)
            .cloned()
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        self.users.read().get(username).cloned()
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<UserRecord> {
        self.users.read().values().find(|u| u.id == id).cloned()
    }

    /// Change a user's tier, returning the updated record.
    pub fn set_tier(&self, id: Uuid, tier: Tier) -> Option<UserRecord> {
        let mut users = self.users.write();
        let record = users.values_mut().find(|u| u.id == id)?;
        record.tier = tier;
        Some(record.clone())
    }

    /// Every registered user, ordered by username.
    pub fn all(&self) -> Vec<UserRecord> {
        let mut records: Vec<UserRecord> = self.users.read().values().cloned().collect();
        records.sort_by(|a, b| a.username.cmp(&b.username));
        records
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Live bearer tokens mapped to usernames.
pub struct SessionRegistry {
    tokens: DashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Issue a fresh token for a signed-in user.
    pub fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), username.to_string());
        Metrics::sessions_active(self.tokens.len() as i64);
        debug!("Issued session token for {}", username);
        token
    }

    /// Username behind a token, `None` when unknown.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).map(|entry| entry.value().clone())
    }

    /// Drop a token. Unknown tokens are a no-op.
    pub fn revoke(&self, token: &str) {
        if self.tokens.remove(token).is_some() {
            Metrics::sessions_active(self.tokens.len() as i64);
        }
    }

    pub fn active(&self) -> usize {
        self.tokens.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the authenticated user for a request.
///
/// A missing header and an unknown token produce distinct 401 details,
/// matching the usual OAuth2 password-bearer wording.
pub fn authenticate(
    sessions: &SessionRegistry,
    users: &UserRegistry,
    headers: &HeaderMap,
) -> ApiResult<UserRecord> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;
    let username = sessions
        .resolve(token)
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))?;
    users
        .get(&username)
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))
}

/// Reject callers below a minimum tier.
pub fn require_tier(user: &UserRecord, min: Tier) -> ApiResult<()> {
    if user.tier >= min {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("tier {min} required")))
    }
}
