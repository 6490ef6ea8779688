use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::WideDataset;

pub const COIN_COLUMN: &str = "Coin";
pub const VALUE_COLUMN: &str = "Market Cap (USD)";

/// One `(timestamp, coin, value)` observation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LongRow {
    pub timestamp: DateTime<Utc>,
    pub coin: String,
    pub value: f64,
}

impl LongRow {
    pub fn new(timestamp: DateTime<Utc>, coin: impl Into<String>, value: f64) -> LongRow {
        LongRow { timestamp, coin: coin.into(), value }
    }
}

/// Reshapes wide to long, row-major. Non-finite cells carry no observation and are dropped.
pub fn melt(dataset: &WideDataset) -> Vec<LongRow> {
    let names = dataset.column_names();
    dataset.rows()
        .flat_map(|(ts, values)| {
            names.iter()
                .zip(values.into_iter())
                .filter(|(_, v)| v.is_finite())
                .map(move |(name, v)| LongRow::new(ts, *name, v))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::dataset::Column;

    #[test]
    fn melts_row_major_and_drops_non_finite() {
        let t1 = Utc.ymd(2024, 2, 1).and_hms(0, 0, 0);
        let t2 = Utc.ymd(2024, 2, 2).and_hms(0, 0, 0);
        let ds = WideDataset::from_parts(vec![t1, t2], vec![
            Column::new("Bitcoin", vec![10.0, 11.0]),
            Column::new("Ratio", vec![f64::NAN, 0.5]),
        ]).unwrap();

        assert_eq!(melt(&ds), vec![
            LongRow::new(t1, "Bitcoin", 10.0),
            LongRow::new(t2, "Bitcoin", 11.0),
            LongRow::new(t2, "Ratio", 0.5),
        ]);
    }
}
