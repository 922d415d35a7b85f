//! Configuration structures.

use quant_backtest::BacktestConfig;
use quant_risk::RiskLimits;
use quant_signals::EngineConfig;
use quant_strategies::{
    StrategySettings, MEAN_REVERSION_ID, MOMENTUM_BREAKOUT_ID, TREND_FOLLOWING_ID, VWAP_REVERSION_ID,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategySettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            logging: LoggingConfig::default(),
            data: DataSettings::default(),
            risk: RiskLimits::default(),
            engine: EngineConfig::default(),
            backtest: BacktestConfig::default(),
            strategies: default_strategies(),
        }
    }
}

/// Every built-in strategy, enabled with its defaults.
fn default_strategies() -> Vec<StrategySettings> {
    [MEAN_REVERSION_ID, MOMENTUM_BREAKOUT_ID, TREND_FOLLOWING_ID, VWAP_REVERSION_ID]
        .into_iter()
        .map(StrategySettings::new)
        .collect()
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
    /// Account capital the risk limits are measured against
    pub capital: Decimal,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "quantcore".to_string(),
            environment: "development".to_string(),
            capital: dec!(100000),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
    /// Daily-rolling log file, in addition to stdout
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory of `<SYMBOL>.csv` files; synthetic bars when unset
    pub csv_dir: Option<String>,
    pub synthetic_seed: u64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            csv_dir: None,
            synthetic_seed: 42,
        }
    }
}
