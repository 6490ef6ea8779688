use chrono::{TimeZone, Utc};
use log::debug;
use snafu::Snafu;

use mcap_domain::models::{Entity, Observation, ObservationSeries};

use crate::coingecko::models::{MarketChartPayload, MarketChartPoint};

#[derive(Debug, Snafu)]
pub enum NormalizeError {
    #[snafu(display("Market cap data not usable for {}: {}", entity, reason))]
    MalformedPayload {
        entity: String,
        reason: String,
    },
}

/// Turns a raw `market_chart` payload into a sorted series.
///
/// Entries that are not `[epoch_millis, value]` pairs, or whose value is missing, negative or
/// not finite, are dropped. A payload with no usable entry at all is an error.
pub fn normalize_market_caps(entity: &Entity, payload: &[u8]) -> Result<ObservationSeries, NormalizeError> {
    let parsed: MarketChartPayload = serde_json::from_slice(payload)
        .map_err(|e| NormalizeError::MalformedPayload { entity: entity.to_string(), reason: e.to_string() })?;

    let points = match parsed.market_caps {
        Some(points) if !points.is_empty() => points,
        _ => return MalformedPayload { entity: entity.to_string(), reason: "missing or empty 'market_caps'" }.fail(),
    };

    let received = points.len();
    let observations: Vec<Observation> = points.into_iter()
        .flatten()
        .filter_map(to_observation)
        .collect();

    if observations.is_empty() {
        return MalformedPayload { entity: entity.to_string(), reason: "no valid entries in 'market_caps'" }.fail();
    }

    if observations.len() < received {
        debug!("Dropped {} of {} malformed entries for {}", received - observations.len(), received, entity);
    }

    Ok(ObservationSeries::new(entity.clone(), observations))
}

fn to_observation(point: MarketChartPoint) -> Option<Observation> {
    let MarketChartPoint(millis, value) = point;
    let value = value.filter(|v| v.is_finite() && *v >= 0f64)?;

    if !millis.is_finite() {
        return None;
    }

    let timestamp = Utc.timestamp_millis_opt(millis.round() as i64).single()?;
    Some(Observation::new(timestamp, value))
}
