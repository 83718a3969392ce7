//! Environment configuration

use std::net::SocketAddr;

use rust_decimal::Decimal;

use crate::dpgf::calculators::parse_decimal;
use crate::dpgf::responses::SerializationPrecision;
use crate::dpgf::services::DEFAULT_TVA_PERCENTAGE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// TVA% when a request omits it
    pub default_tva_percentage: Decimal,
    pub precision: SerializationPrecision,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            default_tva_percentage: DEFAULT_TVA_PERCENTAGE,
            precision: SerializationPrecision::default(),
        }
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { name, value }
}

fn places(name: &'static str, value: String) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n <= 10 => Ok(n),
        _ => Err(invalid(name, value)),
    }
}

impl Config {
    /// Load from process environment (after `.env`, if the caller loaded it)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("DPGF_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DPGF_PORT") {
            config.port = port.trim().parse().map_err(|_| invalid("DPGF_PORT", port))?;
        }
        if let Some(tva) = lookup("DPGF_DEFAULT_TVA") {
            config.default_tva_percentage =
                parse_decimal(&tva).ok_or_else(|| invalid("DPGF_DEFAULT_TVA", tva))?;
        }
        if let Some(value) = lookup("DPGF_QUANTITY_DECIMALS") {
            config.precision.quantity = places("DPGF_QUANTITY_DECIMALS", value)?;
        }
        if let Some(value) = lookup("DPGF_CURRENCY_DECIMALS") {
            config.precision.currency = places("DPGF_CURRENCY_DECIMALS", value)?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| invalid("DPGF_HOST", addr))
    }
}
