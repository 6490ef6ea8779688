use std::time::Duration;

use log::info;
use reqwest::Url;

use mcap_data::Workbook;
use mcap_data::coingecko::DEFAULT_BASE_URL;
use mcap_util::{ConfigContext, ConfigError};

pub const DEFAULT_WORKBOOK: &str = "crypto_market_cap_history";
pub const DEFAULT_COINS: &[&str] = &["bitcoin"];

pub struct Config {
    pub workbook: Workbook,
    pub api_url: Url,
    pub api_key: Option<String>,
    pub coins: Vec<String>,
    pub interval: Duration,
    pub run_once: bool,
}

pub fn config_with_prefix(prefix: &str) -> Result<Config, ConfigError> {
    let config = ConfigContext::new(prefix);

    let workbook = Workbook::new(config.var_or("WORKBOOK", DEFAULT_WORKBOOK));
    info!("Workbook: '{}'", workbook.root().display());

    let api_url_raw = config.var_or("API_URL", DEFAULT_BASE_URL);
    let api_url = Url::parse(&api_url_raw)
        .map_err(|e| ConfigError::InvalidValue {
            name: config.name_of("API_URL"),
            value: api_url_raw.clone(),
            reason: e.to_string(),
        })?;

    let coins = config.list_or("COINS", DEFAULT_COINS);
    info!("Tracking coins: {}", coins.join(", "));

    let interval = config.duration_or("INTERVAL", Duration::from_secs(60))?;
    info!("Polling interval set to {:?}", interval);

    Ok(Config {
        workbook,
        api_url,
        api_key: config.var_opt("API_KEY"),
        coins,
        interval,
        run_once: config.flag_or("RUN_ONCE", false)?,
    })
}
