pub mod top_coins;
pub mod dominance;

use std::collections::HashSet;

use log::{info, warn};
use snafu::Snafu;

use mcap_domain::WideDataset;

pub use self::top_coins::run as run_top_coins;
pub use self::dominance::run as run_dominance;

#[derive(Debug, Snafu)]
pub enum JobError {
    #[snafu(display("No market cap series were fetched, '{}' was left untouched", sheet))]
    NothingFetched { sheet: String },
}

fn no_exclusions() -> HashSet<String> {
    HashSet::new()
}

fn apply_midnight_filter(dataset: WideDataset, midnight_only: bool) -> WideDataset {
    if !midnight_only {
        return dataset;
    }

    let filtered = dataset.retain_midnight();
    let dropped = dataset.len() - filtered.len();
    if dropped > 0 {
        info!("Dropped {} intraday rows, keeping {} midnight rows", dropped, filtered.len());
    }
    if filtered.is_empty() && !dataset.is_empty() {
        warn!("No rows fall exactly on midnight UTC, the saved dataset will be empty");
    }
    filtered
}
