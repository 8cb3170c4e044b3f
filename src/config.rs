use crate::domain::MAX_BALANCE;

/// Environment variable overriding [`PointConfig::max_balance`]
pub const MAX_BALANCE_ENV: &str = "POINT_MAX_BALANCE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointConfig {
    /// Highest balance a credit may produce
    pub max_balance: u64,
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            max_balance: MAX_BALANCE,
        }
    }
}

impl PointConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by the values `lookup` returns
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(MAX_BALANCE_ENV) {
            config.max_balance = parse(MAX_BALANCE_ENV, &value)?;
        }

        tracing::debug!(max_balance = config.max_balance, "loaded point config");
        Ok(config)
    }
}

fn parse(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: err.to_string(),
        })
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}
