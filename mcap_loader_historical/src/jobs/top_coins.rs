use chrono::{DateTime, Utc};
use log::{error, info};

use mcap_data::{CoinGeckoClient, StoreError, fetch_batch};
use mcap_data::coingecko::transport::Transport;
use mcap_data::store::{Workbook, MARKET_CAP_SHEET, CATEGORY_SHEET};
use mcap_data::store::ops::{category_sheet, wide_sheet};
use mcap_domain::{merge, WideDataset};
use mcap_domain::chart::{build_chart, ChartQuery, ChartSeries};
use mcap_domain::long::melt;
use mcap_domain::models::{CategoryTable, ObservationSeries};
use mcap_util::FixedIntervalPacer;

use crate::config::Config;
use super::{apply_midnight_filter, no_exclusions, NothingFetched};

const SUMMARY_SIZE: usize = 5;

/// Rebuilds the market cap history of the current top coins.
pub async fn run<T: Transport>(
    config: &Config,
    client: &CoinGeckoClient<T>,
    pacer: &mut FixedIntervalPacer,
    now: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error>> {
    let entities = client.fetch_top_entities(config.coin_count, &no_exclusions()).await?;
    let outcome = fetch_batch(client, pacer, &entities, config.days).await;

    if outcome.series.is_empty() {
        error!("None of {} coins returned market cap data, leaving '{}' untouched", outcome.total(), MARKET_CAP_SHEET);
        return NothingFetched { sheet: MARKET_CAP_SHEET }.fail().map_err(Into::into);
    }

    let dataset = assemble(&outcome.series, config.midnight_only);
    let categories = CategoryTable::from_known_defaults(&entities);
    save(&config.workbook, &dataset, &categories)?;

    for series in summarize(&dataset, &categories, now) {
        info!("{} [{}]: {:.0} USD", series.label(), series.category, series.latest().unwrap_or_default());
    }

    Ok(())
}

pub fn assemble(series: &[ObservationSeries], midnight_only: bool) -> WideDataset {
    apply_midnight_filter(merge(series), midnight_only)
}

pub fn save(workbook: &Workbook, dataset: &WideDataset, categories: &CategoryTable) -> Result<(), StoreError> {
    wide_sheet::write(workbook, MARKET_CAP_SHEET, dataset)?;
    category_sheet::write(workbook, CATEGORY_SHEET, categories)
}

/// Largest coins by their latest value.
pub fn summarize(dataset: &WideDataset, categories: &CategoryTable, now: DateTime<Utc>) -> Vec<ChartSeries> {
    let query = ChartQuery {
        top_n: Some(SUMMARY_SIZE),
        ..ChartQuery::default()
    };
    build_chart(&melt(dataset), categories, &query, now)
}
