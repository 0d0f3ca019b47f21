use thiserror::Error;
use tracing::warn;

use crate::rating::FormulaVersion;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_K_FACTOR: f64 = 32.0;
const DEV_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown ELO_FORMULA_VERSION: {0} (expected v1 or v2)")]
    FormulaVersion(String),

    #[error("Invalid ELO_K_FACTOR: {0}")]
    KFactor(String),
}

/// Process settings, read once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub formula_version: FormulaVersion,
    pub k_factor: f64,
    pub jwt_secret: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            formula_version: FormulaVersion::default(),
            k_factor: DEFAULT_K_FACTOR,
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup, so tests need not touch the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let formula_version = match lookup("ELO_FORMULA_VERSION") {
            Some(raw) => raw
                .trim()
                .parse::<FormulaVersion>()
                .map_err(|_| ConfigError::FormulaVersion(raw.clone()))?,
            None => defaults.formula_version,
        };

        let k_factor = match lookup("ELO_K_FACTOR") {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value > 0.0 => value,
                _ => return Err(ConfigError::KFactor(raw)),
            },
            None => defaults.k_factor,
        };

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using development secret");
            defaults.jwt_secret.clone()
        });

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            formula_version,
            k_factor,
            jwt_secret,
        })
    }
}
