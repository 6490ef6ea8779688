use chrono::{DateTime, Utc};
use log::{info, warn};

use mcap_data::CoinGeckoClient;
use mcap_data::coingecko::transport::Transport;
use mcap_data::store::{Workbook, HISTORY_SHEET};
use mcap_data::store::ops::long_sheet;
use mcap_domain::long::LongRow;

/// One row per coin with a usable market cap, all stamped `now`.
pub fn latest_rows(now: DateTime<Utc>, latest: &[(String, Option<f64>)]) -> Vec<LongRow> {
    latest.iter()
        .filter_map(|(coin, value)| match value {
            Some(v) if v.is_finite() && *v >= 0f64 => Some(LongRow::new(now, coin.as_str(), *v)),
            _ => {
                warn!("No market cap available for '{}', skipping", coin);
                None
            },
        })
        .collect()
}

/// Fetches the current market caps and appends them to the history sheet.
pub async fn append_latest<T: Transport>(
    client: &CoinGeckoClient<T>,
    workbook: &Workbook,
    coins: &[String],
    now: DateTime<Utc>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let latest = client.fetch_latest_market_caps(coins).await?;
    let rows = latest_rows(now, &latest);

    if rows.is_empty() {
        warn!("Nothing to append at {}", now);
        return Ok(0);
    }

    long_sheet::append(workbook, HISTORY_SHEET, &rows)?;
    info!("Committed {} rows at {}", rows.len(), now);
    Ok(rows.len())
}
