pub mod clock;
pub mod pacer;
pub mod cancel;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use log::{warn, error};
use snafu::{Snafu, ResultExt};

pub use clock::{Clock, SystemClock, ManualClock};
pub use pacer::FixedIntervalPacer;
pub use cancel::AtomicCancellation;

pub fn init_logging(default_filters: &str) {
    let log_env_raw = env::var("RUST_LOG");
    let log_env = log_env_raw.clone().ok()
        .filter(|env| !env.is_empty())
        .unwrap_or_else(|| default_filters.into());

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&log_env)
        .init();

    match &log_env_raw {
        Err(env::VarError::NotUnicode(..)) =>
            error!("Failed to read 'RUST_LOG' due to invalid Unicode. Using default instead: '{}'", default_filters),

        Err(env::VarError::NotPresent) =>
            warn!("Missing 'RUST_LOG'. Using default instead: '{}'", default_filters),

        Ok(s) if s.is_empty() =>
            warn!("Got empty 'RUST_LOG'. Using default instead: '{}'", default_filters),

        Ok(_) => (),
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("'{}' missing or unset in '.env' file: {}", name, source))]
    BadVariable {
        name: String,
        source: env::VarError,
    },

    #[snafu(display("'{}' has invalid value '{}': {}", name, value, reason))]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[snafu(display("{} errors occurred attempting to read config: {:?}", errors.len(), errors))]
    ErrorCollection {
        errors: Vec<ConfigError>,
    }
}

pub trait IntoConfigResult<T> {
    fn into_config_result(self) -> Result<T, ConfigError>;
}

impl<T> IntoConfigResult<T> for Result<T, Vec<ConfigError>> {
    fn into_config_result(self) -> Result<T, ConfigError> {
        self.map_err(|e| match e.len() {
            1 => e.into_iter().next().unwrap_or(ConfigError::ErrorCollection { errors: Vec::new() }),
            _ => ConfigError::ErrorCollection { errors: e },
        })
    }
}

/// Reads `PREFIX_NAME` style variables from the process environment.
pub struct ConfigContext {
    prefix: String,
}

impl ConfigContext {
    pub fn new(prefix: impl AsRef<str>) -> ConfigContext {
        ConfigContext {
            prefix: prefix.as_ref().to_owned(),
        }
    }

    pub fn name_of(&self, name: impl AsRef<str>) -> String {
        format!("{}_{}", self.prefix, name.as_ref())
    }

    pub fn var(&self, name: impl AsRef<str>) -> Result<String, ConfigError> {
        env::var(self.name_of(name.as_ref()))
            .context(BadVariable { name: self.name_of(name.as_ref()) })
    }

    /// Unset and empty variables are both treated as absent.
    pub fn var_opt(&self, name: impl AsRef<str>) -> Option<String> {
        env::var(self.name_of(name.as_ref())).ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
    }

    pub fn var_or(&self, name: impl AsRef<str>, default: impl Into<String>) -> String {
        self.var_opt(name).unwrap_or_else(|| default.into())
    }

    pub fn parse_or<T>(&self, name: impl AsRef<str>, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.var_opt(name.as_ref()) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: self.name_of(name.as_ref()),
                    value: raw.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn duration_or(&self, name: impl AsRef<str>, default: Duration) -> Result<Duration, ConfigError> {
        match self.var_opt(name.as_ref()) {
            None => Ok(default),
            Some(raw) => parse_duration::parse(&raw)
                .map_err(|e| ConfigError::InvalidValue {
                    name: self.name_of(name.as_ref()),
                    value: raw.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Accepts `1/0`, `true/false`, `yes/no` and `on/off`, case-insensitively.
    pub fn flag_or(&self, name: impl AsRef<str>, default: bool) -> Result<bool, ConfigError> {
        match self.var_opt(name.as_ref()) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => InvalidValue {
                    name: self.name_of(name.as_ref()),
                    value: raw.clone(),
                    reason: "expected a boolean flag",
                }.fail(),
            },
        }
    }

    pub fn list_or(&self, name: impl AsRef<str>, default: &[&str]) -> Vec<String> {
        match self.var_opt(name) {
            None => default.iter().map(|s| (*s).to_owned()).collect(),
            Some(raw) => raw.split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_owned())
                .collect(),
        }
    }
}
