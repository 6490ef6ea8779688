#[macro_use]
extern crate lazy_static;

pub mod coingecko;
pub mod normalize;
pub mod store;

pub use coingecko::{CoinGeckoClient, FetchError, BatchOutcome, fetch_batch};
pub use normalize::{normalize_market_caps, NormalizeError};
pub use store::{Workbook, StoreError};
