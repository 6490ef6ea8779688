mod config;
mod latest;

use std::error::Error;
use std::sync::Arc;

use log::{info, error};

use mcap_data::CoinGeckoClient;
use mcap_data::coingecko::ReqwestTransport;
use mcap_util::{init_logging, AtomicCancellation, Clock, FixedIntervalPacer, SystemClock};

use crate::config::config_with_prefix;
use crate::latest::append_latest;

const DEFAULT_LOG_FILTERS: &'static str = "info,mcap_loader=debug";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let env_result = dotenv::dotenv();
    init_logging(DEFAULT_LOG_FILTERS);

    if let Err(err) = env_result {
        error!("Failed to load .env file: {}", err);
    }

    let config = config_with_prefix("MCAP_LOADER")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport = ReqwestTransport::new(config.api_key.clone())?;
    let client = CoinGeckoClient::new(transport, clock.clone(), config.api_url.clone());

    if config.run_once {
        append_latest(&client, &config.workbook, &config.coins, clock.now()).await?;
        info!("Quitting");
        return Ok(());
    }

    let stop_signal_source = AtomicCancellation::new();

    let h = stop_signal_source.clone();
    ctrlc::set_handler(move || {
        h.cancel();
        info!("Shutting down from Ctrl-C signal...");
    })?;

    let mut pacer = FixedIntervalPacer::new(clock.clone(), config.interval);
    let stop_handle = stop_signal_source.clone();
    while stop_handle.can_continue() {
        tokio::select! {
            _ = pacer.acquire() => {},
            _ = stop_handle.cancelled() => break,
        }

        if let Err(err) = append_latest(&client, &config.workbook, &config.coins, clock.now()).await {
            error!("Failed to append latest market caps! Cause: {}", err);
        }
    }

    info!("Quitting");
    Ok(())
}
