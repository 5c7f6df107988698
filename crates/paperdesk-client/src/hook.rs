//! Portfolio state hook.
//!
//! One observable struct of `{data, transactions, is_loading, error}`
//! published on a watch channel. Views subscribe and re-render on
//! every change; `refresh` always performs a full reload, there is no
//! delta path.

use std::sync::Arc;

use paperdesk_core::{PortfolioSnapshot, TransactionRecord};
use tokio::sync::watch;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

/// Transactions fetched alongside the snapshot on each load.
const DEFAULT_TRANSACTION_LIMIT: usize = 50;

/// Observable state for portfolio views.
#[derive(Debug, Clone, Default)]
pub struct PortfolioState {
    /// Latest snapshot. `None` before the first successful load and
    /// after any failed one.
    pub data: Option<PortfolioSnapshot>,
    /// Recent fills, newest first.
    pub transactions: Vec<TransactionRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl PortfolioState {
    fn initial() -> Self {
        Self {
            data: None,
            transactions: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

/// Loads portfolio state on demand and publishes it to subscribers.
pub struct PortfolioHook {
    api: Arc<ApiClient>,
    state: watch::Sender<PortfolioState>,
    transaction_limit: usize,
}

impl PortfolioHook {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(PortfolioState::initial());
        Self {
            api,
            state,
            transaction_limit: DEFAULT_TRANSACTION_LIMIT,
        }
    }

    pub fn with_transaction_limit(mut self, limit: usize) -> Self {
        self.transaction_limit = limit;
        self
    }

    /// Watch the state. The receiver sees the current value
    /// immediately and every change after.
    pub fn subscribe(&self) -> watch::Receiver<PortfolioState> {
        self.state.subscribe()
    }

    /// Current state, cloned out of the watch slot.
    pub fn state(&self) -> PortfolioState {
        self.state.borrow().clone()
    }

    /// Reload the snapshot and recent transactions.
    ///
    /// Loading is flagged while the fetch is in flight. A failure
    /// clears the data and stores the view message; the error is also
    /// returned for callers that branch on it directly.
    pub async fn load(&self) -> ClientResult<PortfolioSnapshot> {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        match self.fetch().await {
            Ok((snapshot, transactions)) => {
                self.state.send_replace(PortfolioState {
                    data: Some(snapshot.clone()),
                    transactions,
                    is_loading: false,
                    error: None,
                });
                Ok(snapshot)
            }
            Err(err) => {
                debug!("Portfolio load failed: {}", err);
                self.state.send_replace(PortfolioState {
                    data: None,
                    transactions: Vec::new(),
                    is_loading: false,
                    error: Some(view_message(&err)),
                });
                Err(err)
            }
        }
    }

    /// Full reload; identical to `load`.
    pub async fn refresh(&self) -> ClientResult<PortfolioSnapshot> {
        self.load().await
    }

    async fn fetch(&self) -> ClientResult<(PortfolioSnapshot, Vec<TransactionRecord>)> {
        let snapshot = self.api.portfolio().await?;
        let transactions = self.api.transactions(self.transaction_limit).await?;
        Ok((snapshot, transactions))
    }
}

/// Message a view shows for a failed load. Parsed API messages and
/// auth conditions pass through verbatim; transport and decode
/// failures collapse to a stable wording.
fn view_message(err: &ClientError) -> String {
    match err {
        ClientError::Http(_) | ClientError::Decode(_) => {
            "Unable to load portfolio data right now.".to_string()
        }
        other => other.to_string(),
    }
}
