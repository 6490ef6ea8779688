use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use snafu::Snafu;

use crate::long::LongRow;
use crate::models::CategoryTable;

#[derive(Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub enum DateRangePreset {
    Last7Days,
    Last1Month,
    Last3Months,
    AllTime,
}

impl Default for DateRangePreset {
    fn default() -> Self {
        DateRangePreset::AllTime
    }
}

impl DateRangePreset {
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            DateRangePreset::Last7Days => Some(Duration::days(7)),
            DateRangePreset::Last1Month => Some(Duration::days(30)),
            DateRangePreset::Last3Months => Some(Duration::days(90)),
            DateRangePreset::AllTime => None,
        }
    }

    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lookback().map(|d| now - d)
    }
}

#[derive(Snafu, Debug)]
pub enum DateRangeParseError {
    #[snafu(display("Invalid date range specified: '{}'", input))]
    InvalidRange {
        input: String,
    }
}

impl FromStr for DateRangePreset {
    type Err = DateRangeParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase()
            .replace(|c: char| !c.is_ascii_alphanumeric(), "")
            .as_str()
        {
            "7d" | "last7days" => Ok(DateRangePreset::Last7Days),
            "1m" | "last1month" => Ok(DateRangePreset::Last1Month),
            "3m" | "last3months" => Ok(DateRangePreset::Last3Months),
            "all" | "alltime" => Ok(DateRangePreset::AllTime),
            _ => InvalidRange { input: s.to_owned() }.fail()
        }
    }
}

/// Filter selections. `None` means "everything".
#[derive(Clone, Debug, Default)]
pub struct ChartQuery {
    pub range: DateRangePreset,
    pub categories: Option<Vec<String>>,
    pub coins: Option<Vec<String>>,
    pub top_n: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartSeries {
    /// 1-based position by descending latest value.
    pub rank: usize,
    pub coin: String,
    pub category: String,
    pub points: Vec<(DateTime<Utc>, f64)>,
}

impl ChartSeries {
    pub fn latest(&self) -> Option<f64> {
        self.points.last().map(|(_, v)| *v)
    }

    pub fn label(&self) -> String {
        format!("#{} {}", self.rank, self.coin)
    }
}

/// Selects and orders the series to plot on a logarithmic value axis.
///
/// Rows are joined to `categories`, then the top-N cutoff, category and coin filters apply,
/// using each coin's latest value over the full history. The date range only trims points.
/// Points that cannot be drawn on a log axis (non-finite or not positive) are left out.
pub fn build_chart(
    rows: &[LongRow],
    categories: &CategoryTable,
    query: &ChartQuery,
    now: DateTime<Utc>,
) -> Vec<ChartSeries> {
    let mut by_coin: BTreeMap<&str, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
    for r in rows {
        by_coin.entry(r.coin.as_str()).or_default().push((r.timestamp, r.value));
    }
    for points in by_coin.values_mut() {
        points.sort_by_key(|(ts, _)| *ts);
    }

    let mut ranked: Vec<(&str, f64)> = by_coin.iter()
        .filter_map(|(coin, points)| points.last().map(|(_, v)| (*coin, *v)))
        .filter(|(_, v)| v.is_finite())
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.0.cmp(b.0)));

    if let Some(n) = query.top_n {
        ranked.truncate(n);
    }

    let selected_categories: Option<HashSet<&str>> = query.categories.as_ref()
        .map(|cs| cs.iter().map(|s| s.as_str()).collect());
    let selected_coins: Option<HashSet<&str>> = query.coins.as_ref()
        .map(|cs| cs.iter().map(|s| s.as_str()).collect());
    let start = query.range.start(now);

    ranked.into_iter()
        .filter(|(coin, _)| selected_categories.as_ref()
            .map_or(true, |s| s.contains(categories.category_of(coin))))
        .filter(|(coin, _)| selected_coins.as_ref()
            .map_or(true, |s| s.contains(coin)))
        .filter_map(|(coin, _)| {
            let points: Vec<_> = by_coin.get(coin)?.iter()
                .filter(|(ts, _)| start.map_or(true, |s| *ts >= s))
                .filter(|(_, v)| v.is_finite() && *v > 0f64)
                .copied()
                .collect();
            if points.is_empty() {
                return None;
            }
            Some((coin, points))
        })
        .enumerate()
        .map(|(i, (coin, points))| ChartSeries {
            rank: i + 1,
            coin: coin.to_owned(),
            category: categories.category_of(coin).to_owned(),
            points,
        })
        .collect()
}
