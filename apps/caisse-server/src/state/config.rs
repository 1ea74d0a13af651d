//! # Configuration State
//!
//! Stores application configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CAISSE_*`)
//! 2. Defaults (this file)
//!
//! ## Environment Variables
//! | Variable | Default |
//! |---|---|
//! | `CAISSE_BIND_ADDR` | `127.0.0.1:8080` |
//! | `CAISSE_DB_PATH` | platform data dir + `caisse.db` |
//! | `CAISSE_REQUIRE_POINT_OF_SALE` | `true` |
//! | `CAISSE_MISSING_PRODUCT_POLICY` | `drop` (or `abort`) |
//! | `CAISSE_CURRENCY` | `CHF` |
//! | `CAISSE_DEFAULT_TAX_RATE` | `8.1` |
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use caisse_core::checkout::MissingProductPolicy;
use caisse_core::validation::normalize_tax_rate;
use caisse_core::{CheckoutOptions, DEFAULT_CURRENCY};

/// Invalid configuration found at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}='{value}' is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("Could not create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct ConfigState {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,

    /// SQLite database file. `None` means the platform default.
    pub database_path: Option<PathBuf>,

    /// Refuse checkout without a selected point-of-sale.
    pub require_point_of_sale: bool,

    pub missing_product_policy: MissingProductPolicy,

    /// Currency code (ISO 4217) used for display.
    pub currency: String,

    /// Tax rate applied to new products that don't specify one, in percent.
    pub default_tax_rate_percent: Decimal,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    fn default() -> Self {
        ConfigState {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_path: None,
            require_point_of_sale: true,
            missing_product_policy: MissingProductPolicy::DropLine,
            currency: DEFAULT_CURRENCY.to_string(),
            default_tax_rate_percent: Decimal::new(81, 1),
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from `CAISSE_*` environment variables and defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ConfigState::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(value) = lookup("CAISSE_BIND_ADDR") {
            config.bind_addr = parse("CAISSE_BIND_ADDR", &value)?;
        }

        if let Some(value) = lookup("CAISSE_DB_PATH") {
            if !value.trim().is_empty() {
                config.database_path = Some(PathBuf::from(value));
            }
        }

        if let Some(value) = lookup("CAISSE_REQUIRE_POINT_OF_SALE") {
            config.require_point_of_sale = parse_bool("CAISSE_REQUIRE_POINT_OF_SALE", &value)?;
        }

        if let Some(value) = lookup("CAISSE_MISSING_PRODUCT_POLICY") {
            config.missing_product_policy =
                MissingProductPolicy::from_str(&value).map_err(|reason| ConfigError::Invalid {
                    var: "CAISSE_MISSING_PRODUCT_POLICY",
                    value: value.clone(),
                    reason,
                })?;
        }

        if let Some(value) = lookup("CAISSE_CURRENCY") {
            let code = value.trim().to_ascii_uppercase();
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::Invalid {
                    var: "CAISSE_CURRENCY",
                    value,
                    reason: "expected a three-letter currency code".to_string(),
                });
            }
            config.currency = code;
        }

        if let Some(value) = lookup("CAISSE_DEFAULT_TAX_RATE") {
            let rate: Decimal = parse("CAISSE_DEFAULT_TAX_RATE", &value)?;
            config.default_tax_rate_percent =
                normalize_tax_rate(rate).map_err(|e| ConfigError::Invalid {
                    var: "CAISSE_DEFAULT_TAX_RATE",
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
        }

        Ok(config)
    }

    /// Database path, falling back to the platform data directory.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/ch.caisse.caisse/caisse.db`
    /// - **Windows**: `%APPDATA%\caisse\caisse\data\caisse.db`
    /// - **Linux**: `~/.local/share/caisse/caisse.db`
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("ch", "caisse", "caisse").ok_or(ConfigError::NoDataDir)?;
        let data_dir = proj_dirs.data_dir();

        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::DataDir {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("caisse.db"))
    }

    pub fn checkout_options(&self) -> CheckoutOptions {
        CheckoutOptions {
            require_point_of_sale: self.require_point_of_sale,
            missing_product_policy: self.missing_product_policy,
        }
    }

    /// The subset of settings the frontend needs.
    pub fn public_view(&self) -> PublicConfig {
        PublicConfig {
            currency: self.currency.clone(),
            default_tax_rate_percent: self.default_tax_rate_percent,
            require_point_of_sale: self.require_point_of_sale,
            missing_product_policy: self.missing_product_policy.to_string(),
        }
    }
}

/// Configuration as served by `GET /api/config`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub currency: String,
    pub default_tax_rate_percent: Decimal,
    pub require_point_of_sale: bool,
    pub missing_product_policy: String,
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConfigState::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.require_point_of_sale);
        assert_eq!(config.missing_product_policy, MissingProductPolicy::DropLine);
        assert_eq!(config.currency, "CHF");
        assert_eq!(config.default_tax_rate_percent, dec!(8.1));
    }

    #[test]
    fn test_overrides() {
        let config = ConfigState::from_lookup(lookup(&[
            ("CAISSE_BIND_ADDR", "0.0.0.0:9000"),
            ("CAISSE_DB_PATH", "/tmp/caisse.db"),
            ("CAISSE_REQUIRE_POINT_OF_SALE", "false"),
            ("CAISSE_MISSING_PRODUCT_POLICY", "abort"),
            ("CAISSE_CURRENCY", "eur"),
            ("CAISSE_DEFAULT_TAX_RATE", "0.077"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.resolve_database_path().unwrap(), PathBuf::from("/tmp/caisse.db"));
        assert!(!config.checkout_options().require_point_of_sale);
        assert_eq!(config.missing_product_policy, MissingProductPolicy::Abort);
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.default_tax_rate_percent, dec!(7.7));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = ConfigState::from_lookup(lookup(&[("CAISSE_REQUIRE_POINT_OF_SALE", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("CAISSE_REQUIRE_POINT_OF_SALE"));

        assert!(ConfigState::from_lookup(lookup(&[("CAISSE_DEFAULT_TAX_RATE", "250")])).is_err());
        assert!(ConfigState::from_lookup(lookup(&[("CAISSE_BIND_ADDR", "nowhere")])).is_err());
    }
}
