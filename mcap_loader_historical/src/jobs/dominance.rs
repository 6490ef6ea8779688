use std::collections::HashSet;

use log::{error, info, warn};

use mcap_data::{CoinGeckoClient, fetch_batch};
use mcap_data::coingecko::transport::Transport;
use mcap_data::store::MARKET_CAP_SHEET;
use mcap_data::store::ops::wide_sheet;
use mcap_domain::{compute_derived, merge, merge_group, Column, DatasetError, WideDataset};
use mcap_domain::metrics::{columns, dominance_formulas, CORE_ENTITIES, DOMINANCE_LAYOUT};
use mcap_domain::models::{Entity, ObservationSeries};
use mcap_util::FixedIntervalPacer;

use crate::config::Config;
use super::{apply_midnight_filter, NothingFetched};

/// Rebuilds the stablecoin and dominance history.
pub async fn run<T: Transport>(
    config: &Config,
    client: &CoinGeckoClient<T>,
    pacer: &mut FixedIntervalPacer,
) -> Result<(), Box<dyn std::error::Error>> {
    let core: Vec<Entity> = CORE_ENTITIES.iter()
        .map(|(id, _)| Entity::new(*id, *id))
        .collect();

    let excluded: HashSet<String> = CORE_ENTITIES.iter()
        .map(|(id, _)| (*id).to_owned())
        .collect();

    let altcoins = client.fetch_top_entities(config.coin_count, &excluded).await?;

    let core_outcome = fetch_batch(client, pacer, &core, config.days).await;
    let altcoin_outcome = fetch_batch(client, pacer, &altcoins, config.days).await;

    info!("Altcoins with data: {} of {}", altcoin_outcome.succeeded(), altcoin_outcome.total());

    if core_outcome.series.is_empty() && altcoin_outcome.series.is_empty() {
        error!("No market cap series could be fetched, leaving '{}' untouched", MARKET_CAP_SHEET);
        return NothingFetched { sheet: MARKET_CAP_SHEET }.fail().map_err(Into::into);
    }

    let dataset = assemble(&core_outcome.series, &altcoin_outcome.series, config.midnight_only)?;
    wide_sheet::write(&config.workbook, MARKET_CAP_SHEET, &dataset)?;

    if let Some((ts, values)) = dataset.rows().last() {
        let row: Vec<String> = DOMINANCE_LAYOUT.iter()
            .zip(values)
            .map(|(name, v)| format!("{}={:.2}", name, v))
            .collect();
        info!("Latest row at {}: {}", ts, row.join(", "));
    }

    Ok(())
}

/// Core columns plus the altcoin aggregate, zero-filled, with every derived column, in
/// `DOMINANCE_LAYOUT` order.
///
/// `core` series are matched to their dataset column by entity id; series for any other id
/// are ignored. A core column with no data is kept as zeros so that the layout stays fixed.
pub fn assemble(
    core: &[ObservationSeries],
    altcoins: &[ObservationSeries],
    midnight_only: bool,
) -> Result<WideDataset, DatasetError> {
    let labelled: Vec<ObservationSeries> = core.iter()
        .filter_map(|s| {
            let (_, column) = CORE_ENTITIES.iter().find(|(id, _)| *id == s.entity().id())?;
            let entity = s.entity().renamed(*column);
            Some(s.clone().with_entity(entity))
        })
        .collect();

    let mut core = merge(&labelled);
    for (id, column) in CORE_ENTITIES {
        if !core.has_column(column) {
            warn!("No market cap data for '{}', filling '{}' with zeros", id, column);
            core.insert_column(Column::new(*column, vec![0f64; core.len()]))?;
        }
    }

    let aggregate = merge_group(altcoins, columns::ALTCOINS)?
        .select(&[columns::ALTCOINS])?;

    let joined = core.outer_join(&aggregate);
    let derived = compute_derived(&joined, &dominance_formulas())?
        .select(DOMINANCE_LAYOUT)?;

    Ok(apply_midnight_filter(derived, midnight_only))
}
