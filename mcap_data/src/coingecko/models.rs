use std::collections::HashMap;

use serde::Deserialize;
use serde_with::serde_as;
use mcap_ext_serde::Lenient;

/// Element of `GET /coins/markets`.
#[derive(Deserialize, Debug, Clone)]
pub struct CoinMarket {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

/// `GET /coins/{id}/market_chart`. Only the market cap series is kept.
#[serde_as]
#[derive(Deserialize, Debug, Default)]
pub struct MarketChartPayload {
    #[serde(default)]
    #[serde_as(as = "Option<Vec<Lenient>>")]
    pub market_caps: Option<Vec<Option<MarketChartPoint>>>,
}

/// `[epoch_millis, value]`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MarketChartPoint(
    pub f64,
    pub Option<f64>,
);

/// `GET /simple/price`, keyed by coin id, then by field (`usd`, `usd_market_cap`, ...).
pub type SimplePriceResponse = HashMap<String, HashMap<String, Option<f64>>>;
