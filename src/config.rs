use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::hub::DEFAULT_BROADCAST_CAPACITY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    /// SQLite documents when set, JSON files in `data_dir` otherwise.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub history_limit: usize,
    pub history_window: usize,
    pub broadcast_capacity: usize,
    pub session_hours: i64,
    pub bcrypt_cost: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            database_url: None,
            data_dir: PathBuf::from("."),
            history_limit: 500,
            history_window: 200,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            session_hours: 6,
            bcrypt_cost: None,
        }
    }
}

impl Config {
    /// `.env` first, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut config = Self {
            bind: parse(&lookup, "SALON_BIND")?.unwrap_or(defaults.bind),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            data_dir: lookup("SALON_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            history_limit: parse(&lookup, "SALON_HISTORY_LIMIT")?.unwrap_or(defaults.history_limit),
            history_window: parse(&lookup, "SALON_HISTORY_WINDOW")?.unwrap_or(defaults.history_window),
            broadcast_capacity: parse(&lookup, "SALON_BROADCAST_CAPACITY")?
                .unwrap_or(defaults.broadcast_capacity),
            session_hours: parse(&lookup, "SALON_SESSION_HOURS")?.unwrap_or(defaults.session_hours),
            bcrypt_cost: parse(&lookup, "SALON_BCRYPT_COST")?,
        };

        if config.history_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "SALON_HISTORY_LIMIT",
                value: "0".to_owned(),
            });
        }
        config.history_window = config.history_window.min(config.history_limit);

        Ok(config)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(None),
    }
}
