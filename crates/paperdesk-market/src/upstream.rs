//! REST upstream provider (finnhub-shaped wire contract).
//!
//! Fetches live quotes and daily candles over HTTPS with bounded
//! retries. Every failure mode collapses into `ProviderUnavailable`;
//! the service layer decides whether to fall back.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use paperdesk_core::{Bar, BarRange, Market, Quote, QuoteSource};
use paperdesk_telemetry::Metrics;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{MarketError, MarketResult};
use crate::provider::QuoteProvider;

/// Default upstream API origin.
pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Timeout for a single upstream request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Total attempts per logical fetch.
const RETRY_ATTEMPTS: u32 = 4;

/// First retry delay; doubles after each failed attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Quote payload: current, change, percent change, high, low, open,
/// previous close, unix seconds. `d`/`dp` arrive null for symbols the
/// provider does not cover.
#[derive(Debug, Deserialize)]
struct QuoteWire {
    c: Decimal,
    #[serde(default)]
    d: Option<Decimal>,
    #[serde(default)]
    dp: Option<Decimal>,
    h: Decimal,
    l: Decimal,
    o: Decimal,
    pc: Decimal,
    t: i64,
}

/// Candle payload: parallel arrays plus a status discriminator.
#[derive(Debug, Deserialize)]
struct CandleWire {
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<Decimal>,
    #[serde(default)]
    h: Vec<Decimal>,
    #[serde(default)]
    l: Vec<Decimal>,
    #[serde(default)]
    c: Vec<Decimal>,
    #[serde(default)]
    v: Vec<f64>,
}

/// HTTPS client for the upstream quote API.
pub struct UpstreamProvider {
    client: Client,
    base_url: String,
    token: String,
}

impl UpstreamProvider {
    /// Create a provider against the given API origin.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> MarketResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                MarketError::ProviderUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// GET a JSON endpoint with bounded retries and doubling backoff.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        endpoint: &str,
    ) -> MarketResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut delay = RETRY_BASE_DELAY;
        let mut last_error = String::new();

        for attempt in 1..=RETRY_ATTEMPTS {
            let started = Instant::now();
            match self.client.get(&url).query(params).send().await {
                Ok(response) => {
                    Metrics::provider_latency(endpoint, started.elapsed().as_secs_f64() * 1000.0);
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<T>().await {
                            Ok(value) => return Ok(value),
                            Err(e) => {
                                Metrics::provider_failure("decode");
                                last_error = format!("Failed to parse response: {e}");
                            }
                        }
                    } else {
                        Metrics::provider_failure("bad_status");
                        let body = response.text().await.unwrap_or_default();
                        last_error = format!("HTTP {status}: {body}");
                    }
                }
                Err(e) => {
                    Metrics::provider_failure("http");
                    last_error = format!("HTTP request failed: {e}");
                }
            }

            warn!(endpoint, attempt, error = %last_error, "Upstream request failed");
            if attempt < RETRY_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Metrics::provider_failure("exhausted");
        Err(MarketError::ProviderUnavailable(format!(
            "{endpoint} failed after {RETRY_ATTEMPTS} attempts: {last_error}"
        )))
    }
}

#[async_trait]
impl QuoteProvider for UpstreamProvider {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn fetch_quote(&self, symbol: &str, market: Market) -> MarketResult<Quote> {
        let wire_symbol = market.provider_symbol(symbol);
        let params = [
            ("symbol", wire_symbol.clone()),
            ("token", self.token.clone()),
        ];
        let wire: QuoteWire = self.get_json("quote", &params, "quote").await?;

        // Zero price is the provider's "no data for this symbol" marker.
        if wire.c.is_zero() {
            return Err(MarketError::ProviderUnavailable(format!(
                "no data for symbol {wire_symbol}"
            )));
        }

        debug!(symbol = %wire_symbol, price = %wire.c, "Fetched upstream quote");
        Ok(quote_from_wire(symbol, market, wire))
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        market: Market,
        range: BarRange,
    ) -> MarketResult<Vec<Bar>> {
        let wire_symbol = market.provider_symbol(symbol);
        let to = Utc::now().timestamp();
        let from = to - range.lookback_days() * 86_400;
        let params = [
            ("symbol", wire_symbol.clone()),
            ("resolution", range.resolution().to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("token", self.token.clone()),
        ];
        let wire: CandleWire = self.get_json("stock/candle", &params, "candle").await?;

        if wire.s != "ok" {
            return Err(MarketError::ProviderUnavailable(format!(
                "no candle data for {wire_symbol}: status {}",
                wire.s
            )));
        }
        bars_from_wire(wire)
    }
}

fn quote_from_wire(symbol: &str, market: Market, wire: QuoteWire) -> Quote {
    let change = wire.d.unwrap_or(wire.c - wire.pc);
    let change_percent = wire.dp.unwrap_or_else(|| {
        if wire.pc > Decimal::ZERO {
            (wire.c - wire.pc) / wire.pc * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    });

    Quote {
        symbol: symbol.to_string(),
        market,
        price: wire.c,
        change,
        change_percent,
        bid: None,
        ask: None,
        high: Some(wire.h),
        low: Some(wire.l),
        open: Some(wire.o),
        prev_close: Some(wire.pc),
        volume: None,
        timestamp_ms: wire.t * 1000,
        source: Some(QuoteSource::Upstream),
    }
}

fn bars_from_wire(wire: CandleWire) -> MarketResult<Vec<Bar>> {
    let n = wire.t.len();
    if wire.o.len() != n
        || wire.h.len() != n
        || wire.l.len() != n
        || wire.c.len() != n
        || wire.v.len() != n
    {
        return Err(MarketError::ProviderUnavailable(
            "malformed candle response: array length mismatch".to_string(),
        ));
    }

    let bars = (0..n)
        .map(|i| Bar {
            timestamp_ms: wire.t[i] * 1000,
            open: wire.o[i],
            high: wire.h[i],
            low: wire.l[i],
            close: wire.c[i],
            volume: wire.v[i] as u64,
        })
        .collect();
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_wire_decode() {
        let json = r#"{"c":228.52,"d":1.12,"dp":0.4925,"h":229.87,"l":226.41,"o":227.0,"pc":227.4,"t":1724236800}"#;
        let wire: QuoteWire = serde_json::from_str(json).unwrap();
        assert_eq!(wire.c, dec!(228.52));
        assert_eq!(wire.dp, Some(dec!(0.4925)));
    }

    #[test]
    fn test_quote_wire_null_change_fields() {
        let json = r#"{"c":100.0,"d":null,"dp":null,"h":101.0,"l":99.0,"o":99.5,"pc":99.0,"t":1724236800}"#;
        let wire: QuoteWire = serde_json::from_str(json).unwrap();
        let quote = quote_from_wire("TEST", Market::Us, wire);
        assert_eq!(quote.change, dec!(1.0));
        // (100 - 99) / 99 * 100
        assert_eq!(quote.change_percent.round_dp(4), dec!(1.0101));
    }

    #[test]
    fn test_quote_wire_missing_required_field_fails() {
        // No close price at all: decode must fail, not default to zero
        let json = r#"{"d":1.0,"dp":0.5,"h":101.0,"l":99.0,"o":99.5,"pc":99.0,"t":1724236800}"#;
        assert!(serde_json::from_str::<QuoteWire>(json).is_err());
    }

    #[test]
    fn test_quote_timestamp_upscaled_to_millis() {
        let json = r#"{"c":50.0,"d":0.0,"dp":0.0,"h":50.0,"l":50.0,"o":50.0,"pc":50.0,"t":1724236800}"#;
        let wire: QuoteWire = serde_json::from_str(json).unwrap();
        let quote = quote_from_wire("TEST", Market::Us, wire);
        assert_eq!(quote.timestamp_ms, 1_724_236_800_000);
        assert_eq!(quote.source, Some(QuoteSource::Upstream));
    }

    #[test]
    fn test_candle_arrays_zipped() {
        let json = r#"{"s":"ok","t":[1724150400,1724236800],"o":[226.0,227.0],"h":[229.0,229.9],"l":[225.5,226.4],"c":[227.4,228.5],"v":[1000000.0,1200000.0]}"#;
        let wire: CandleWire = serde_json::from_str(json).unwrap();
        let bars = bars_from_wire(wire).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, dec!(228.5));
        assert_eq!(bars[1].volume, 1_200_000);
    }

    #[test]
    fn test_candle_length_mismatch_rejected() {
        let json = r#"{"s":"ok","t":[1724150400,1724236800],"o":[226.0],"h":[229.0],"l":[225.5],"c":[227.4],"v":[1000000.0]}"#;
        let wire: CandleWire = serde_json::from_str(json).unwrap();
        assert!(bars_from_wire(wire).is_err());
    }

    #[test]
    fn test_no_data_status() {
        let json = r#"{"s":"no_data"}"#;
        let wire: CandleWire = serde_json::from_str(json).unwrap();
        assert_eq!(wire.s, "no_data");
        assert!(wire.t.is_empty());
    }
}
