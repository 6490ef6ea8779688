use log::{info, warn, error};

use mcap_domain::models::{Entity, ObservationSeries};
use mcap_util::FixedIntervalPacer;

use super::{CoinGeckoClient, FetchError};
use super::transport::Transport;

/// Result of fetching a batch of entities; every requested entity lands in exactly one list.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub series: Vec<ObservationSeries>,
    pub empty: Vec<Entity>,
    pub failed: Vec<(Entity, FetchError)>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.series.len()
    }

    pub fn total(&self) -> usize {
        self.series.len() + self.empty.len() + self.failed.len()
    }
}

/// Fetches each entity's series in order, starting each request no sooner than the pacer allows.
///
/// Per-entity failures are recorded and do not stop the batch.
pub async fn fetch_batch<T: Transport>(
    client: &CoinGeckoClient<T>,
    pacer: &mut FixedIntervalPacer,
    entities: &[Entity],
    days: u32,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let total = entities.len();

    for (i, entity) in entities.iter().enumerate() {
        pacer.acquire().await;
        info!("Fetching market caps for {} ({}/{})", entity, i + 1, total);

        match client.fetch_series(entity, days).await {
            Ok(series) if series.is_empty() => {
                warn!("No market cap data for {}", entity);
                outcome.empty.push(entity.clone());
            },
            Ok(series) => {
                info!("Collected {} points for {}", series.len(), entity);
                outcome.series.push(series);
            },
            Err(e) => {
                error!("Failed to fetch market caps for {}: {}", entity, e);
                outcome.failed.push((entity.clone(), e));
            },
        }
    }

    info!("Batch complete: {} of {} entities returned data", outcome.succeeded(), total);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::coingecko::testing::*;

    const CHART: &str = r#"{"market_caps": [[1709251200000, 5.0e10]]}"#;

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("solana", "Solana"),
            Entity::new("zcash", "Zcash"),
            Entity::new("ripple", "XRP"),
            Entity::new("tron", "TRON"),
        ]
    }

    #[tokio::test]
    async fn partial_failure_keeps_the_rest() {
        let transport = ScriptedTransport::new(vec![
            (200, CHART),
            (500, "oops"),
            (200, r#"{"market_caps": []}"#),
            (200, CHART),
        ]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());
        let mut pacer = FixedIntervalPacer::new(clock.clone(), Duration::from_secs(15));

        let outcome = fetch_batch(&client, &mut pacer, &entities(), 365).await;

        let ok: Vec<&str> = outcome.series.iter().map(|s| s.entity().id()).collect();
        assert_eq!(ok, vec!["solana", "tron"]);
        assert_eq!(outcome.empty, vec![Entity::new("ripple", "XRP")]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0.id(), "zcash");
        assert_eq!(outcome.total(), 4);
    }

    #[tokio::test]
    async fn requests_are_paced() {
        let transport = ScriptedTransport::new(vec![(200, CHART); 4]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());
        let mut pacer = FixedIntervalPacer::new(clock.clone(), Duration::from_secs(15));

        let outcome = fetch_batch(&client, &mut pacer, &entities(), 30).await;

        assert_eq!(outcome.succeeded(), 4);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(15); 3]);
    }

    #[tokio::test]
    async fn throttled_entity_is_retried_inside_the_batch() {
        let transport = ScriptedTransport::new(vec![
            (200, CHART),
            (429, ""),
            (200, CHART),
        ]);
        let clock = manual_clock();
        let client = CoinGeckoClient::new(transport.clone(), clock.clone(), base_url());
        let mut pacer = FixedIntervalPacer::new(clock.clone(), Duration::from_secs(2));

        let outcome = fetch_batch(&client, &mut pacer, &entities()[..2], 30).await;

        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2), Duration::from_secs(60)]);
    }
}
