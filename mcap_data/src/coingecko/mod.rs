pub mod models;
pub mod transport;
pub mod batch;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, info, warn, error};
use reqwest::{StatusCode, Url};
use snafu::{Snafu, ResultExt, ensure};

use mcap_domain::models::{Entity, ObservationSeries};
use mcap_util::Clock;

use crate::normalize::normalize_market_caps;
use self::models::{CoinMarket, SimplePriceResponse};
use self::transport::{RawResponse, Transport};

pub use self::batch::{fetch_batch, BatchOutcome};
pub use self::transport::ReqwestTransport;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3/";
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
pub const DEFAULT_VS_CURRENCY: &str = "usd";

/// Largest page `/coins/markets` will return.
pub const MAX_PAGE_SIZE: usize = 250;

#[derive(Debug, Snafu)]
pub enum FetchError {
    #[snafu(display("Failed to complete HTTP request: {}", source))]
    Http { source: reqwest::Error },

    #[snafu(display("Cannot build request URL from base '{}'", base))]
    InvalidEndpoint { base: String },

    #[snafu(display("Upstream responded with HTTP {} for {}", status, url))]
    Upstream { status: StatusCode, url: String },

    #[snafu(display("Still rate limited after cooldown for {}", url))]
    Throttled { url: String },

    #[snafu(display("Failed to deserialize response: {}", source))]
    Deserialization { source: serde_json::Error },
}

pub struct CoinGeckoClient<T = ReqwestTransport> {
    transport: T,
    clock: Arc<dyn Clock>,
    base_url: Url,
    vs_currency: String,
    cooldown: Duration,
}

impl<T: Transport> CoinGeckoClient<T> {
    pub fn new(transport: T, clock: Arc<dyn Clock>, base_url: Url) -> CoinGeckoClient<T> {
        CoinGeckoClient {
            transport,
            clock,
            base_url,
            vs_currency: DEFAULT_VS_CURRENCY.to_owned(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> CoinGeckoClient<T> {
        self.cooldown = cooldown;
        self
    }

    pub fn base_url(&self) -> &Url { &self.base_url }
    pub fn cooldown(&self) -> Duration { self.cooldown }

    /// Top `n` entities by market cap, descending, skipping any id in `exclude`.
    ///
    /// When excluding, twice as many are requested so the filtered list can still be filled.
    pub async fn fetch_top_entities(&self, n: usize, exclude: &HashSet<String>) -> Result<Vec<Entity>, FetchError> {
        let per_page = if exclude.is_empty() { n } else { n.saturating_mul(2) };
        let per_page = per_page.min(MAX_PAGE_SIZE).max(1);

        let url = self.endpoint(&["coins", "markets"], &[
            ("vs_currency", self.vs_currency.clone()),
            ("order", "market_cap_desc".to_owned()),
            ("per_page", per_page.to_string()),
            ("page", "1".to_owned()),
            ("sparkline", "false".to_owned()),
        ])?;

        let body = self.get(url).await?;
        let markets: Vec<CoinMarket> = serde_json::from_slice(&body)
            .context(Deserialization)?;

        let entities: Vec<Entity> = markets.into_iter()
            .filter(|m| !exclude.contains(&m.id))
            .take(n)
            .map(|m| Entity::new(m.id, m.name))
            .collect();

        if entities.len() < n {
            warn!("Requested top {} coins but only {} remain after exclusions", n, entities.len());
        }

        info!("Fetched top {} coins by market cap", entities.len());
        Ok(entities)
    }

    /// Daily market cap history for the last `days` days.
    ///
    /// A payload without usable points yields an empty series rather than an error.
    pub async fn fetch_series(&self, entity: &Entity, days: u32) -> Result<ObservationSeries, FetchError> {
        let url = self.endpoint(&["coins", entity.id(), "market_chart"], &[
            ("vs_currency", self.vs_currency.clone()),
            ("days", days.to_string()),
            ("interval", "daily".to_owned()),
        ])?;

        let body = self.get(url).await?;
        match normalize_market_caps(entity, &body) {
            Ok(series) => Ok(series),
            Err(e) => {
                error!("{}", e);
                Ok(ObservationSeries::empty(entity.clone()))
            },
        }
    }

    /// Current market cap per id. Ids unknown upstream map to `None`.
    pub async fn fetch_latest_market_caps(&self, ids: &[String]) -> Result<Vec<(String, Option<f64>)>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&["simple", "price"], &[
            ("ids", ids.join(",")),
            ("vs_currencies", self.vs_currency.clone()),
            ("include_market_cap", "true".to_owned()),
        ])?;

        let body = self.get(url).await?;
        let prices: SimplePriceResponse = serde_json::from_slice(&body)
            .context(Deserialization)?;

        let field = format!("{}_market_cap", self.vs_currency);
        let latest = ids.iter()
            .map(|id| {
                let value = prices.get(id)
                    .and_then(|fields| fields.get(&field))
                    .copied()
                    .flatten();
                (id.clone(), value)
            })
            .collect();

        Ok(latest)
    }

    /// GET with a single retry after `cooldown` when rate limited.
    async fn get(&self, url: Url) -> Result<Bytes, FetchError> {
        debug!("GET {}", url);
        let mut response = self.send(&url).await?;

        if response.status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by upstream, waiting {:?} before retrying {}", self.cooldown, url);
            self.clock.sleep(self.cooldown).await;
            response = self.send(&url).await?;

            ensure!(response.status != StatusCode::TOO_MANY_REQUESTS, Throttled { url: url.as_str() });
        }

        ensure!(response.status.is_success(), Upstream { status: response.status, url: url.as_str() });
        Ok(response.body)
    }

    async fn send(&self, url: &Url) -> Result<RawResponse, FetchError> {
        self.transport.get(url.clone()).await
            .context(Http)
    }

    /// Query pairs already on the base URL are kept ahead of `params`.
    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();

        match url.path_segments_mut() {
            Ok(mut path) => { path.pop_if_empty().extend(segments); },
            Err(()) => return InvalidEndpoint { base: self.base_url.as_str() }.fail(),
        }

        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::*;

    const CHART: &str = r#"{"market_caps": [[1709251200000, 1.0e12], [1709337600000, 1.1e12]]}"#;

    fn bitcoin() -> Entity {
        Entity::new("bitcoin", "Bitcoin")
    }

    #[tokio::test]
    async fn retries_once_after_cooldown_when_throttled() {
        let transport = ScriptedTransport::new(vec![(429, ""), (200, CHART)]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());

        let series = client.fetch_series(&bitcoin(), 365).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(clock.sleeps(), vec![DEFAULT_COOLDOWN]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn second_throttle_is_an_error() {
        let transport = ScriptedTransport::new(vec![(429, ""), (429, "")]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url())
            .with_cooldown(Duration::from_secs(5));

        let err = client.fetch_series(&bitcoin(), 30).await.unwrap_err();

        assert!(matches!(err, FetchError::Throttled { .. }), "{:?}", err);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn other_statuses_are_upstream_errors_without_retry() {
        let transport = ScriptedTransport::new(vec![(404, r#"{"error":"coin not found"}"#)]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());

        let err = client.fetch_series(&Entity::new("nope", "Nope"), 30).await.unwrap_err();

        match err {
            FetchError::Upstream { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_yields_empty_series() {
        let transport = ScriptedTransport::new(vec![(200, r#"{"prices": []}"#)]);
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base_url());

        let series = client.fetch_series(&bitcoin(), 30).await.unwrap();
        assert!(series.is_empty());
        assert_eq!(series.entity().id(), "bitcoin");
    }

    #[tokio::test]
    async fn series_request_targets_market_chart() {
        let transport = ScriptedTransport::new(vec![(200, CHART)]);
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base_url());

        client.fetch_series(&bitcoin(), 90).await.unwrap();

        let requests = transport.requests();
        let url = &requests[0];
        assert_eq!(url.path(), "/api/v3/coins/bitcoin/market_chart");
        assert_eq!(url.query(), Some("vs_currency=usd&days=90&interval=daily"));
    }

    #[tokio::test]
    async fn top_entities_skip_excluded_ids_and_keep_order() {
        let markets = r#"[
            {"id":"bitcoin","symbol":"btc","name":"Bitcoin"},
            {"id":"ethereum","symbol":"eth","name":"Ethereum"},
            {"id":"tether","symbol":"usdt","name":"Tether"},
            {"id":"solana","symbol":"sol","name":"Solana"},
            {"id":"usd-coin","symbol":"usdc","name":"USDC"},
            {"id":"ripple","symbol":"xrp","name":"XRP"}
        ]"#;
        let transport = ScriptedTransport::new(vec![(200, markets)]);
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base_url());

        let exclude: HashSet<String> = ["bitcoin", "ethereum", "tether", "usd-coin"].iter()
            .map(|s| s.to_string())
            .collect();
        let top = client.fetch_top_entities(2, &exclude).await.unwrap();

        let ids: Vec<&str> = top.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["solana", "ripple"]);
        assert_eq!(top[1].name(), "XRP");

        let query = transport.requests()[0].query().unwrap().to_owned();
        assert!(query.contains("per_page=4"), "{}", query);
    }

    #[tokio::test]
    async fn top_entities_page_is_capped() {
        let transport = ScriptedTransport::new(vec![(200, "[]")]);
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base_url());

        let exclude: HashSet<String> = vec!["bitcoin".to_string()].into_iter().collect();
        let top = client.fetch_top_entities(200, &exclude).await.unwrap();

        assert!(top.is_empty());
        assert!(transport.requests()[0].query().unwrap().contains("per_page=250"));
    }

    #[tokio::test]
    async fn latest_market_caps_follow_requested_ids() {
        let body = r#"{
            "bitcoin": {"usd": 91000.0, "usd_market_cap": 1.8e12},
            "ethereum": {"usd": 3100.0, "usd_market_cap": null}
        }"#;
        let transport = ScriptedTransport::new(vec![(200, body)]);
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base_url());

        let ids = vec!["ethereum".to_string(), "bitcoin".to_string(), "zcash".to_string()];
        let latest = client.fetch_latest_market_caps(&ids).await.unwrap();

        assert_eq!(latest, vec![
            ("ethereum".to_string(), None),
            ("bitcoin".to_string(), Some(1.8e12)),
            ("zcash".to_string(), None),
        ]);
        assert_eq!(transport.requests()[0].path(), "/api/v3/simple/price");
    }

    #[tokio::test]
    async fn base_url_without_trailing_slash() {
        let transport = ScriptedTransport::new(vec![(200, CHART)]);
        let base = Url::parse("http://localhost:8080/api/v3").unwrap();
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base);

        client.fetch_series(&bitcoin(), 1).await.unwrap();
        assert_eq!(transport.requests()[0].path(), "/api/v3/coins/bitcoin/market_chart");
    }

    #[tokio::test]
    async fn base_url_query_is_kept() {
        let transport = ScriptedTransport::new(vec![(200, CHART)]);
        let base = Url::parse("http://localhost:8080/api/v3/?x_cg_demo_api_key=abc").unwrap();
        let client = CoinGeckoClient::new(transport.clone(), manual_clock(), base);

        client.fetch_series(&bitcoin(), 7).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].path(), "/api/v3/coins/bitcoin/market_chart");
        assert_eq!(requests[0].query(), Some("x_cg_demo_api_key=abc&vs_currency=usd&days=7&interval=daily"));
    }

    #[tokio::test]
    async fn top_entities_server_error_is_upstream_error() {
        for status in [500u16, 404].iter() {
            let transport = ScriptedTransport::new(vec![(*status, "oops")]);
            let clock = manual_clock();
            let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());

            let err = client.fetch_top_entities(10, &HashSet::new()).await.unwrap_err();

            match err {
                FetchError::Upstream { status: got, url } => {
                    assert_eq!(got.as_u16(), *status);
                    assert!(url.contains("/coins/markets"), "{}", url);
                },
                other => panic!("unexpected error: {:?}", other),
            }
            assert!(clock.sleeps().is_empty());
            assert_eq!(transport.requests().len(), 1);
        }
    }

    #[tokio::test]
    async fn top_entities_throttled_twice_is_an_error() {
        let transport = ScriptedTransport::new(vec![(429, ""), (429, ""), (200, "[]")]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());

        let err = client.fetch_top_entities(10, &HashSet::new()).await.unwrap_err();

        assert!(matches!(err, FetchError::Throttled { .. }), "{:?}", err);
        assert_eq!(clock.sleeps(), vec![DEFAULT_COOLDOWN]);
        assert_eq!(transport.requests().len(), 2);
    }
}
