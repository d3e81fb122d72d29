use std::{env, ops::RangeInclusive, path::PathBuf, str::FromStr};

use log::warn;

/// Reads a variable, returning None when it is unset or blank.
pub fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Reads a numeric variable, falling back to `default` when it is unset, unparseable or out of range.
pub fn env_in_range<T>(name: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let Some(raw) = env_string(name) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => value,
        Ok(value) => {
            warn!(
                "{} = {} is outside {}..={}, using {}",
                name,
                value,
                range.start(),
                range.end(),
                default
            );
            default
        }
        Err(_) => {
            warn!("{} = {:?} is not a number, using {}", name, raw, default);
            default
        }
    }
}

/// Where the ephemeral backend keeps its snapshot, and which durable store to use instead.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub connection_string: Option<String>,
    pub data_file: PathBuf,
    pub encryption_key: Option<String>,
    pub default_staff_password: Option<String>,
}

impl StoreConfig {
    pub const DEFAULT_DATA_FILE: &'static str = "venueplus-data.json";

    pub fn from_env() -> Self {
        Self {
            connection_string: env_string("VENUEPLUS_DB_CONNECTION"),
            data_file: env_string("VENUEPLUS_DATA_FILE")
                .unwrap_or_else(|| Self::DEFAULT_DATA_FILE.to_string())
                .into(),
            encryption_key: env_string("VENUEPLUS_ENCRYPTION_KEY"),
            default_staff_password: env_string("VENUEPLUS_DEFAULT_STAFF_PASS"),
        }
    }
}
