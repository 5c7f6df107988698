//! Static instrument directory for symbol search.

use paperdesk_core::Market;
use serde::Serialize;

/// Most results returned per search.
pub const SEARCH_LIMIT: usize = 10;

/// Directory entry. `kind` is `"stock"` or `"etf"`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Instrument {
    pub symbol: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

static US_INSTRUMENTS: &[Instrument] = &[
    Instrument { symbol: "AAPL", name: "Apple Inc.", kind: "stock" },
    Instrument { symbol: "MSFT", name: "Microsoft Corporation", kind: "stock" },
    Instrument { symbol: "GOOGL", name: "Alphabet Inc.", kind: "stock" },
    Instrument { symbol: "AMZN", name: "Amazon.com Inc.", kind: "stock" },
    Instrument { symbol: "TSLA", name: "Tesla Inc.", kind: "stock" },
    Instrument { symbol: "META", name: "Meta Platforms Inc.", kind: "stock" },
    Instrument { symbol: "NVDA", name: "NVIDIA Corporation", kind: "stock" },
    Instrument { symbol: "JPM", name: "JPMorgan Chase & Co.", kind: "stock" },
    Instrument { symbol: "V", name: "Visa Inc.", kind: "stock" },
    Instrument { symbol: "WMT", name: "Walmart Inc.", kind: "stock" },
    Instrument { symbol: "SPY", name: "SPDR S&P 500 ETF", kind: "etf" },
    Instrument { symbol: "QQQ", name: "Invesco QQQ Trust", kind: "etf" },
];

static IN_INSTRUMENTS: &[Instrument] = &[
    Instrument { symbol: "RELIANCE.NS", name: "Reliance Industries Ltd", kind: "stock" },
    Instrument { symbol: "TCS.NS", name: "Tata Consultancy Services", kind: "stock" },
    Instrument { symbol: "HDFCBANK.NS", name: "HDFC Bank Ltd", kind: "stock" },
    Instrument { symbol: "INFY.NS", name: "Infosys Ltd", kind: "stock" },
    Instrument { symbol: "HINDUNILVR.NS", name: "Hindustan Unilever Ltd", kind: "stock" },
    Instrument { symbol: "ICICIBANK.NS", name: "ICICI Bank Ltd", kind: "stock" },
    Instrument { symbol: "SBIN.NS", name: "State Bank of India", kind: "stock" },
    Instrument { symbol: "BHARTIARTL.NS", name: "Bharti Airtel Ltd", kind: "stock" },
    Instrument { symbol: "ITC.NS", name: "ITC Ltd", kind: "stock" },
    Instrument { symbol: "KOTAKBANK.NS", name: "Kotak Mahindra Bank", kind: "stock" },
];

/// Instruments listed for a market.
pub fn instruments(market: Market) -> &'static [Instrument] {
    match market {
        Market::Us => US_INSTRUMENTS,
        Market::In => IN_INSTRUMENTS,
    }
}

/// Case-insensitive substring search over symbol and name,
/// capped at `SEARCH_LIMIT` results.
pub fn search(query: &str, market: Market) -> Vec<Instrument> {
    let needle = query.to_lowercase();
    instruments(market)
        .iter()
        .filter(|i| {
            i.symbol.to_lowercase().contains(&needle) || i.name.to_lowercase().contains(&needle)
        })
        .take(SEARCH_LIMIT)
        .copied()
        .collect()
}
