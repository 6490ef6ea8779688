use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use log::info;
use reqwest::Url;

use mcap_data::Workbook;
use mcap_data::coingecko::{DEFAULT_BASE_URL, DEFAULT_COOLDOWN};
use mcap_util::{ConfigContext, ConfigError, IntoConfigResult};

pub const DEFAULT_WORKBOOK: &str = "crypto_market_cap_history";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    TopCoins,
    Dominance,
}

impl Job {
    fn defaults(self) -> JobDefaults {
        match self {
            Job::TopCoins => JobDefaults {
                coin_count: 50,
                request_delay: Duration::from_secs(15),
                midnight_only: false,
            },
            Job::Dominance => JobDefaults {
                coin_count: 100,
                request_delay: Duration::from_secs(2),
                midnight_only: true,
            },
        }
    }
}

impl FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top_coins" => Ok(Job::TopCoins),
            "dominance" => Ok(Job::Dominance),
            other => Err(format!("unknown job '{}', expected 'top_coins' or 'dominance'", other)),
        }
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Job::TopCoins => f.write_str("top_coins"),
            Job::Dominance => f.write_str("dominance"),
        }
    }
}

struct JobDefaults {
    coin_count: usize,
    request_delay: Duration,
    midnight_only: bool,
}

#[derive(Debug)]
pub struct Config {
    pub job: Job,
    pub workbook: Workbook,
    pub api_url: Url,
    pub api_key: Option<String>,
    pub coin_count: usize,
    pub days: u32,
    pub request_delay: Duration,
    pub cooldown: Duration,
    pub midnight_only: bool,
}

pub fn config_with_prefix(prefix: &str) -> Result<Config, ConfigError> {
    let config = ConfigContext::new(prefix);

    let job = config.parse_or("JOB", Job::TopCoins)?;
    let defaults = job.defaults();
    info!("Job: '{}'", job);

    let mut errors = Vec::new();
    let coin_count = collect(&mut errors, config.parse_or("COIN_COUNT", defaults.coin_count), defaults.coin_count);
    let days = collect(&mut errors, config.parse_or("DAYS", 365u32), 365);
    let request_delay = collect(&mut errors, config.duration_or("REQUEST_DELAY", defaults.request_delay), defaults.request_delay);
    let cooldown = collect(&mut errors, config.duration_or("COOLDOWN", DEFAULT_COOLDOWN), DEFAULT_COOLDOWN);
    let midnight_only = collect(&mut errors, config.flag_or("MIDNIGHT_ONLY", defaults.midnight_only), defaults.midnight_only);

    let api_url_raw = config.var_or("API_URL", DEFAULT_BASE_URL);
    let api_url = Url::parse(&api_url_raw)
        .map_err(|e| ConfigError::InvalidValue {
            name: config.name_of("API_URL"),
            value: api_url_raw.clone(),
            reason: e.to_string(),
        })
        .map_err(|e| errors.push(e))
        .ok();

    let api_url = match api_url {
        Some(url) if errors.is_empty() => url,
        _ => return Err::<Config, _>(errors).into_config_result(),
    };

    let workbook = Workbook::new(config.var_or("WORKBOOK", DEFAULT_WORKBOOK));
    info!("Workbook: '{}'", workbook.root().display());
    info!("Request delay: {:?}, cooldown: {:?}", request_delay, cooldown);

    Ok(Config {
        job,
        workbook,
        api_url,
        api_key: config.var_opt("API_KEY"),
        coin_count,
        days,
        request_delay,
        cooldown,
        midnight_only,
    })
}

fn collect<T>(errors: &mut Vec<ConfigError>, result: Result<T, ConfigError>, default: T) -> T {
    result.unwrap_or_else(|e| {
        errors.push(e);
        default
    })
}
