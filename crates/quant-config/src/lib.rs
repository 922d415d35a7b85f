//! Configuration management.
//!
//! Sources are layered lowest first: built-in defaults, an optional TOML
//! file, `QUANT__SECTION__KEY` environment variables, then explicit
//! key/value overrides. The result is an immutable [`AppConfig`].

mod settings;

pub use config::ConfigError;
pub use settings::{AppConfig, AppSettings, DataSettings, LoggingConfig};

use config::{Config, Environment, File};
use quant_strategies::StrategyRegistry;
use rust_decimal::Decimal;
use std::path::Path;

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    load_config_with_overrides(Some(path), &[])
}

/// Load configuration and apply `overrides` as dotted `key = value` pairs
/// (e.g. `risk.max_daily_loss = -0.03`) on top of every other source.
///
/// Without a path only defaults, environment and overrides apply.
pub fn load_config_with_overrides(
    path: Option<&Path>,
    overrides: &[(String, String)],
) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix("QUANT")
            .separator("__")
            .try_parsing(true),
    );
    for (key, value) in overrides {
        builder = builder.set_override(key.as_str(), value.as_str())?;
    }

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Parse `key=value` strings, as given on the command line.
pub fn parse_overrides<S: AsRef<str>>(pairs: &[S]) -> Result<Vec<(String, String)>, ConfigError> {
    pairs
        .iter()
        .map(|pair| {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(ConfigError::Message(format!(
                    "override must look like key=value, got '{}'",
                    pair
                ))),
            }
        })
        .collect()
}

impl AppConfig {
    /// Check every section, including that each enabled strategy builds
    /// from its params.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.capital <= Decimal::ZERO {
            return Err(ConfigError::Message(format!(
                "app.capital must be positive, got {}",
                self.app.capital
            )));
        }
        self.risk
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        self.engine
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        self.backtest
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        StrategyRegistry::new()
            .create_enabled(&self.strategies)
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
