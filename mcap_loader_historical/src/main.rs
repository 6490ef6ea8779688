mod config;
mod jobs;

use std::error::Error;
use std::sync::Arc;

use log::{info, error};

use mcap_data::CoinGeckoClient;
use mcap_data::coingecko::ReqwestTransport;
use mcap_util::{init_logging, Clock, FixedIntervalPacer, SystemClock};

use crate::config::{config_with_prefix, Job};

const DEFAULT_LOG_FILTERS: &'static str = "info,mcap_loader_historical=debug,mcap_data=debug";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let env_result = dotenv::dotenv();
    init_logging(DEFAULT_LOG_FILTERS);

    if let Err(err) = env_result {
        error!("Failed to load .env file: {}", err);
    }

    let config = config_with_prefix("MCAP_LOADER_HIST")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport = ReqwestTransport::new(config.api_key.clone())?;
    let client = CoinGeckoClient::new(transport, clock.clone(), config.api_url.clone())
        .with_cooldown(config.cooldown);

    let mut pacer = FixedIntervalPacer::new(clock.clone(), config.request_delay);
    info!("Fetching {} coins over {} days, one request every {:?}", config.coin_count, config.days, pacer.interval());

    match config.job {
        Job::TopCoins => jobs::run_top_coins(&config, &client, &mut pacer, clock.now()).await?,
        Job::Dominance => jobs::run_dominance(&config, &client, &mut pacer).await?,
    }

    info!("Done");
    Ok(())
}
