//! Tarifa API configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tarifa_common::{Result, TarifaError};
use tarifa_engine::EngineConfig;

/// API service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
    /// JSON catalog seed loaded at startup
    pub catalog_path: Option<PathBuf>,
    /// Fallback margin settings
    pub pricing: PricingSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8086,
            catalog_path: None,
            pricing: PricingSettings::default(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        // Platform-provided PORT first, TARIFA_PORT overrides it
        if let Some(port) = lookup("PORT") {
            cfg.port = parse_var("PORT", &port)?;
        }
        if let Some(port) = lookup("TARIFA_PORT") {
            cfg.port = parse_var("TARIFA_PORT", &port)?;
        }
        if let Some(host) = lookup("TARIFA_HOST") {
            cfg.host = host;
        }
        if let Some(path) = lookup("TARIFA_CATALOG_PATH").filter(|p| !p.is_empty()) {
            cfg.catalog_path = Some(PathBuf::from(path));
        }

        // Pricing settings
        if let Some(val) = lookup("TARIFA_FALLBACK_MULTIPLIER") {
            cfg.pricing.fallback_multiplier = parse_var("TARIFA_FALLBACK_MULTIPLIER", &val)?;
        }
        if let Some(val) = lookup("TARIFA_FALLBACK_FEE") {
            cfg.pricing.fallback_fee = parse_var("TARIFA_FALLBACK_FEE", &val)?;
        }
        cfg.pricing.engine_config().validate()?;

        Ok(cfg)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| TarifaError::Config(format!("{key}={value:?}: {e}")))
}

/// Margin applied when no margin rule matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    pub fallback_multiplier: Decimal,
    pub fallback_fee: Decimal,
}

impl Default for PricingSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            fallback_multiplier: engine.fallback_multiplier,
            fallback_fee: engine.fallback_fee,
        }
    }
}

impl PricingSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fallback_multiplier: self.fallback_multiplier,
            fallback_fee: self.fallback_fee,
        }
    }
}
