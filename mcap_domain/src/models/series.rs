use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Entity;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Observation {
        Observation { timestamp, value }
    }
}

/// Market-cap history of one entity. Timestamps are strictly increasing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ObservationSeries {
    entity: Entity,
    observations: Vec<Observation>,
}

impl ObservationSeries {
    pub fn empty(entity: Entity) -> ObservationSeries {
        ObservationSeries { entity, observations: Vec::new() }
    }

    /// Sorts by timestamp. For a repeated timestamp the last observation in input order wins.
    pub fn new(entity: Entity, mut observations: Vec<Observation>) -> ObservationSeries {
        // Stable sort keeps input order among equal timestamps
        observations.sort_by_key(|o| o.timestamp);

        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for o in observations {
            match deduped.last_mut() {
                Some(last) if last.timestamp == o.timestamp => *last = o,
                _ => deduped.push(o),
            }
        }

        ObservationSeries { entity, observations: deduped }
    }

    pub fn entity(&self) -> &Entity { &self.entity }
    pub fn observations(&self) -> &[Observation] { &self.observations }
    pub fn len(&self) -> usize { self.observations.len() }
    pub fn is_empty(&self) -> bool { self.observations.is_empty() }

    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn with_entity(self, entity: Entity) -> ObservationSeries {
        ObservationSeries { entity, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.ymd(2024, 3, day).and_hms(0, 0, 0)
    }

    #[test]
    fn sorts_and_dedupes_timestamps() {
        let series = ObservationSeries::new(
            Entity::new("bitcoin", "Bitcoin"),
            vec![
                Observation::new(ts(3), 3.0),
                Observation::new(ts(1), 1.0),
                Observation::new(ts(2), 2.0),
                Observation::new(ts(1), 1.5),
            ]);

        let timestamps: Vec<_> = series.observations().iter().map(|o| o.timestamp).collect();
        assert_eq!(timestamps, vec![ts(1), ts(2), ts(3)]);
        assert_eq!(series.observations()[0].value, 1.5);
        assert_eq!(series.latest().map(|o| o.value), Some(3.0));
    }

    #[test]
    fn empty_series_has_no_latest() {
        let series = ObservationSeries::empty(Entity::new("zcash", "Zcash"));
        assert!(series.is_empty());
        assert!(series.latest().is_none());
    }
}
