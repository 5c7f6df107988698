//! REST API client.
//!
//! Thin typed wrapper over the paper-trading HTTP surface: auth,
//! portfolio, market quotes and order submission. Authorized calls
//! attach the session's bearer token; a 401 response invalidates the
//! session and surfaces as `SessionExpired` without a retry. Error
//! payloads follow the `{"detail": ...}` convention and are parsed
//! into plain messages in a fixed order so views can show them
//! verbatim.

use std::sync::Arc;
use std::time::Duration;

use paperdesk_core::{Market, PortfolioSnapshot, Quote, TransactionRecord};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Timeout for a single API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Token issued at sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Signed-in user, as returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub tier: String,
    pub cash_balance: Decimal,
    pub is_admin: bool,
}

/// Order confirmation returned by the trade endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeConfirmation {
    pub status: String,
    pub symbol: String,
    pub qty: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub borrow_rate_annual: Option<Decimal>,
}

/// Trade direction selected on the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeIntent {
    Buy,
    Sell,
    Short,
    Cover,
}

impl TradeIntent {
    /// REST route for this intent.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Buy => "/trade/buy",
            Self::Sell => "/trade/sell",
            Self::Short => "/trade/short",
            Self::Cover => "/trade/cover",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Short => "short",
            Self::Cover => "cover",
        }
    }
}

impl std::fmt::Display for TradeIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct QuotesEnvelope {
    quotes: Vec<Quote>,
}

/// Typed client for the paper-trading REST API.
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<Session>) -> ClientResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign in with username and password.
    ///
    /// The form-encoded body matches the server's OAuth2 password
    /// flow. On success the token is stored on the session so
    /// subsequent authorized calls carry it.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<TokenResponse> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let token: TokenResponse = decode_response(response).await?;
        self.session.authenticate(token.access_token.clone());
        info!("Signed in as {}", username);
        Ok(token)
    }

    /// Create an account, then sign in with the new credentials.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<TokenResponse> {
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        });
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&body)
            .send()
            .await?;
        // Surface registration failures before attempting the sign-in
        let profile: UserProfile = decode_response(response).await?;
        debug!("Registered account {}", profile.username);
        self.login(username, password).await
    }

    /// Profile of the signed-in user.
    pub async fn me(&self) -> ClientResult<UserProfile> {
        let request = self.authorized(Method::GET, "/auth/me")?;
        self.send_authorized(request).await
    }

    /// Current account snapshot with margin figures.
    pub async fn portfolio(&self) -> ClientResult<PortfolioSnapshot> {
        let request = self.authorized(Method::GET, "/portfolio")?;
        self.send_authorized(request).await
    }

    /// Most recent fills, newest first.
    pub async fn transactions(&self, limit: usize) -> ClientResult<Vec<TransactionRecord>> {
        let request = self
            .authorized(Method::GET, "/portfolio/transactions")?
            .query(&[("limit", limit)]);
        self.send_authorized(request).await
    }

    /// Live quote for one symbol. Does not require a session.
    pub async fn quote(&self, symbol: &str, market: Market) -> ClientResult<Quote> {
        let response = self
            .client
            .get(self.url(&format!("/market/quote/{}", symbol)))
            .query(&[("market", market.as_str())])
            .send()
            .await?;
        decode_response(response).await
    }

    /// Live quotes for a batch of symbols in one market.
    pub async fn quotes(&self, symbols: &[&str], market: Market) -> ClientResult<Vec<Quote>> {
        let response = self
            .client
            .get(self.url("/market/quotes"))
            .query(&[
                ("symbols", symbols.join(",")),
                ("market", market.as_str().to_string()),
            ])
            .send()
            .await?;
        let envelope: QuotesEnvelope = decode_response(response).await?;
        Ok(envelope.quotes)
    }

    /// Submit a market order, routed by intent. The fill price comes
    /// from the server's live quote, not from the caller.
    pub async fn trade(
        &self,
        intent: TradeIntent,
        symbol: &str,
        market: Market,
        qty: Decimal,
    ) -> ClientResult<TradeConfirmation> {
        let request = self.authorized(Method::POST, intent.endpoint())?.query(&[
            ("symbol", symbol.to_string()),
            ("market", market.as_str().to_string()),
            ("qty", qty.to_string()),
        ]);
        let confirmation: TradeConfirmation = self.send_authorized(request).await?;
        debug!(
            "Order confirmed: {} {} {} @ {}",
            intent, confirmation.qty, confirmation.symbol, confirmation.price
        );
        Ok(confirmation)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Build an authorized request, failing fast when no token is held.
    fn authorized(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = match self.session.token() {
            Some(token) => token,
            None => return Err(ClientError::Unauthenticated),
        };
        Ok(self
            .client
            .request(method, self.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", token)))
    }

    /// Send an authorized request and decode the response.
    ///
    /// A 401 means the token is no longer good: the session is
    /// invalidated and the error reported, never a silent retry.
    async fn send_authorized<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            warn!("Token rejected by server, session invalidated");
            return Err(ClientError::SessionExpired);
        }
        decode_response(response).await
    }
}

/// Decode a response body, mapping non-success statuses to `Api`
/// errors carrying the parsed message.
async fn decode_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: parse_error_message(status, &body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Extract a human-readable message from an error payload.
///
/// Checked in order: a string `detail`, the `msg` of the first entry
/// when `detail` is an array, then a string `message`. Bodies that
/// yield none of these fall back to the status reason, with 401 worded
/// as a session expiry.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail") {
            if let Some(s) = detail.as_str() {
                return s.to_string();
            }
            if let Some(first) = detail.as_array().and_then(|a| a.first()) {
                if let Some(msg) = first.get("msg").and_then(|m| m.as_str()) {
                    return msg.to_string();
                }
            }
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    if status == StatusCode::UNAUTHORIZED {
        return "Session expired. Please sign in again.".to_string();
    }
    status.canonical_reason().unwrap_or("Request failed").to_string()
}
