//! Strategy registry for building strategies from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use quant_core::{
    error::StrategyError,
    traits::{SignalStrategy, StrategyConfig},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    MeanReversionConfig, MeanReversionStrategy, MomentumConfig, MomentumStrategy, TrendFollowingConfig,
    TrendFollowingStrategy, VwapReversionConfig, VwapReversionStrategy, MEAN_REVERSION_ID,
    MOMENTUM_BREAKOUT_ID, TREND_FOLLOWING_ID, VWAP_REVERSION_ID,
};

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: Value,
}

/// One entry of the `strategies` list in application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides on top of the strategy's defaults; `null` keeps them all.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

fn default_enabled() -> bool {
    true
}

impl StrategySettings {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            params: Value::Null,
        }
    }
}

/// Registry of the built-in strategies, keyed by id.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: BTreeMap::new(),
        };
        registry.register(MEAN_REVERSION_ID, &MeanReversionStrategy::default(), &MeanReversionConfig::default());
        registry.register(MOMENTUM_BREAKOUT_ID, &MomentumStrategy::default(), &MomentumConfig::default());
        registry.register(TREND_FOLLOWING_ID, &TrendFollowingStrategy::default(), &TrendFollowingConfig::default());
        registry.register(VWAP_REVERSION_ID, &VwapReversionStrategy::default(), &VwapReversionConfig::default());
        registry
    }

    fn register<C: Serialize>(&mut self, id: &str, strategy: &dyn SignalStrategy, config: &C) {
        self.strategies.insert(
            id.to_string(),
            StrategyInfo {
                id: id.to_string(),
                name: strategy.name().to_string(),
                description: strategy.description().to_string(),
                default_config: serde_json::to_value(config).unwrap_or_default(),
            },
        );
    }

    /// All strategies, ordered by id.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    pub fn get(&self, id: &str) -> Option<&StrategyInfo> {
        self.strategies.get(id)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Build a strategy from JSON parameters.
    ///
    /// Missing fields take their defaults and `null` means all defaults.
    /// The merged configuration is validated before construction.
    pub fn create(&self, id: &str, params: Value) -> Result<Arc<dyn SignalStrategy>, StrategyError> {
        let strategy: Arc<dyn SignalStrategy> = match id {
            MEAN_REVERSION_ID => Arc::new(MeanReversionStrategy::new(parse_config(params)?)),
            MOMENTUM_BREAKOUT_ID => Arc::new(MomentumStrategy::new(parse_config(params)?)),
            TREND_FOLLOWING_ID => Arc::new(TrendFollowingStrategy::new(parse_config(params)?)),
            VWAP_REVERSION_ID => Arc::new(VwapReversionStrategy::new(parse_config(params)?)),
            _ => return Err(StrategyError::NotFound(id.to_string())),
        };
        debug!("Created strategy {} (warm-up {} bars)", id, strategy.warmup_period());
        Ok(strategy)
    }

    pub fn create_default(&self, id: &str) -> Result<Arc<dyn SignalStrategy>, StrategyError> {
        self.create(id, Value::Null)
    }

    /// Build every enabled entry, failing on the first bad one.
    pub fn create_enabled(&self, settings: &[StrategySettings]) -> Result<Vec<Arc<dyn SignalStrategy>>, StrategyError> {
        let strategies = settings
            .iter()
            .filter(|s| s.enabled)
            .map(|s| self.create(&s.id, s.params.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Loaded {} of {} configured strategies",
            strategies.len(),
            settings.len()
        );
        Ok(strategies)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config<C>(params: Value) -> Result<C, StrategyError>
where
    C: DeserializeOwned + Default + StrategyConfig,
{
    let config: C = match params {
        Value::Null => C::default(),
        value => serde_json::from_value(value).map_err(|e| StrategyError::InvalidConfig(e.to_string()))?,
    };
    config.validate()?;
    Ok(config)
}
