//! Mean reversion: oversold/overbought RSI at a Bollinger band extreme,
//! confirmed by a volume spike.

use quant_core::{
    error::StrategyError,
    traits::{BarIndicator, ExitRules, Indicator, MultiOutputIndicator, SignalStrategy, StrategyConfig},
    types::{closes, Bar, Signal},
};
use quant_indicators::{Atr, BollingerBands, Rsi, VolumeProfile};
use serde::{Deserialize, Serialize};

use crate::scoring::{check_window, missing, ScoreCard, SignalGate};

pub const MEAN_REVERSION_ID: &str = "mean_reversion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionConfig {
    pub rsi_period: usize,
    /// RSI at or below this scores 50 buy points
    pub rsi_extreme_oversold: f64,
    /// RSI at or below this scores 35 buy points
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_extreme_overbought: f64,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    /// Relative distance from a band that still counts as a touch
    pub band_tolerance: f64,
    pub volume_period: usize,
    pub high_volume_ratio: f64,
    pub elevated_volume_ratio: f64,
    pub atr_period: usize,
    pub exit: ExitRules,
    pub gate: SignalGate,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_extreme_oversold: 20.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_extreme_overbought: 80.0,
            bb_period: 20,
            bb_std_dev: 2.0,
            band_tolerance: 0.005,
            volume_period: 20,
            high_volume_ratio: 2.5,
            elevated_volume_ratio: 1.5,
            atr_period: 14,
            exit: ExitRules::default(),
            gate: SignalGate::default(),
        }
    }
}

impl StrategyConfig for MeanReversionConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.rsi_period == 0 || self.volume_period == 0 || self.atr_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "indicator periods must be positive".into(),
            ));
        }
        if self.bb_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "BB period must be at least 2".into(),
            ));
        }
        if !(self.bb_std_dev > 0.0) {
            return Err(StrategyError::InvalidConfig(
                "BB std dev must be positive".into(),
            ));
        }
        if !(self.rsi_extreme_oversold <= self.rsi_oversold
            && self.rsi_oversold < self.rsi_overbought
            && self.rsi_overbought <= self.rsi_extreme_overbought)
        {
            return Err(StrategyError::InvalidConfig(
                "RSI levels must be ordered extreme_oversold <= oversold < overbought <= extreme_overbought".into(),
            ));
        }
        if !(self.elevated_volume_ratio > 0.0 && self.elevated_volume_ratio <= self.high_volume_ratio) {
            return Err(StrategyError::InvalidConfig(
                "volume ratios must satisfy 0 < elevated <= high".into(),
            ));
        }
        self.exit.validate()?;
        self.gate.validate()
    }
}

pub struct MeanReversionStrategy {
    config: MeanReversionConfig,
    rsi: Rsi,
    bb: BollingerBands,
    volume: VolumeProfile,
    atr: Atr,
}

impl MeanReversionStrategy {
    pub fn new(config: MeanReversionConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            bb: BollingerBands::with_params(config.bb_period, config.bb_std_dev),
            volume: VolumeProfile::new(config.volume_period, config.high_volume_ratio),
            atr: Atr::new(config.atr_period),
            config,
        }
    }

    pub fn config(&self) -> &MeanReversionConfig {
        &self.config
    }
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self::new(MeanReversionConfig::default())
    }
}

impl SignalStrategy for MeanReversionStrategy {
    fn id(&self) -> &str {
        MEAN_REVERSION_ID
    }

    fn name(&self) -> &str {
        "Mean Reversion"
    }

    fn description(&self) -> &str {
        "Fades RSI extremes at the Bollinger bands on heavy volume"
    }

    fn warmup_period(&self) -> usize {
        self.rsi
            .period()
            .max(self.bb.period())
            .max(self.volume.period())
            .max(self.atr.period())
    }

    fn exit_rules(&self) -> ExitRules {
        self.config.exit
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Option<Signal>, StrategyError> {
        let Some(last) = bars.last() else {
            return Ok(None);
        };
        if !self.is_warmed_up(bars.len()) {
            return Ok(None);
        }
        check_window(bars)?;

        let closes = closes(bars);
        let rsi = self.rsi.latest(&closes).ok_or_else(|| missing("RSI"))?;
        let bands = self.bb.latest(&closes).ok_or_else(|| missing("Bollinger Bands"))?;
        let volume = self.volume.latest(bars).ok_or_else(|| missing("volume profile"))?;
        let atr = self.atr.latest(bars).ok_or_else(|| missing("ATR"))?;
        let c = &self.config;

        let mut card = ScoreCard::new();
        card.record("rsi", rsi);
        card.record("bb_upper", bands.upper);
        card.record("bb_middle", bands.middle);
        card.record("bb_lower", bands.lower);
        card.record("volume_ratio", volume.ratio);
        card.record("atr", atr);

        if rsi <= c.rsi_extreme_oversold {
            card.buy(50.0, format!("RSI {:.1} deeply oversold", rsi));
        } else if rsi <= c.rsi_oversold {
            card.buy(35.0, format!("RSI {:.1} oversold", rsi));
        } else if rsi >= c.rsi_extreme_overbought {
            card.sell(50.0, format!("RSI {:.1} deeply overbought", rsi));
        } else if rsi >= c.rsi_overbought {
            card.sell(35.0, format!("RSI {:.1} overbought", rsi));
        }

        if bands.touches_lower(last.close, c.band_tolerance) {
            card.buy(30.0, format!("close {:.2} at lower band {:.2}", last.close, bands.lower));
        } else if bands.touches_upper(last.close, c.band_tolerance) {
            card.sell(30.0, format!("close {:.2} at upper band {:.2}", last.close, bands.upper));
        }

        if volume.ratio >= c.high_volume_ratio {
            card.confirm(20.0, format!("volume {:.1}x average", volume.ratio));
        } else if volume.ratio >= c.elevated_volume_ratio {
            card.confirm(10.0, format!("volume {:.1}x average", volume.ratio));
        }

        Ok(card.into_signal(self.id(), symbol, last, atr, &c.exit, &c.gate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_data::scenarios::{overbought_blowoff, oversold_capitulation, quiet_market};
    use quant_core::types::SignalDirection;

    #[test]
    fn test_capitulation_buy() {
        let strategy = MeanReversionStrategy::default();
        let bars = oversold_capitulation();

        let signal = strategy.evaluate("AAPL", &bars).unwrap().unwrap();
        assert_eq!(signal.direction, SignalDirection::Buy);
        assert!(signal.confidence >= 70.0);
        assert!(signal.indicators["rsi"] <= 20.0);
        assert!(signal.price <= signal.indicators["bb_lower"]);
        assert!(signal.stop_loss.unwrap() < signal.price);
        assert!(signal.take_profit.unwrap() > signal.price);
        assert_eq!(signal.strategy_id, MEAN_REVERSION_ID);
    }

    #[test]
    fn test_blowoff_sell() {
        let strategy = MeanReversionStrategy::default();
        let signal = strategy.evaluate("AAPL", &overbought_blowoff()).unwrap().unwrap();
        assert_eq!(signal.direction, SignalDirection::Sell);
        assert!(signal.stop_loss.unwrap() > signal.price);
        assert!(signal.take_profit.unwrap() < signal.price);
    }

    #[test]
    fn test_quiet_market_has_no_signal() {
        let strategy = MeanReversionStrategy::default();
        assert!(strategy.evaluate("AAPL", &quiet_market(60)).unwrap().is_none());
    }

    #[test]
    fn test_short_window_is_not_an_error() {
        let strategy = MeanReversionStrategy::default();
        let bars = oversold_capitulation();
        assert_eq!(strategy.warmup_period(), 21);
        assert!(strategy.evaluate("AAPL", &bars[..20]).unwrap().is_none());
        assert!(strategy.evaluate("AAPL", &[]).unwrap().is_none());
    }

    #[test]
    fn test_unordered_window_is_rejected() {
        let strategy = MeanReversionStrategy::default();
        let mut bars = oversold_capitulation();
        bars.swap(3, 4);
        assert!(matches!(
            strategy.evaluate("AAPL", &bars),
            Err(StrategyError::Evaluation(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(MeanReversionConfig::default().validate().is_ok());
        let bad = MeanReversionConfig {
            rsi_oversold: 80.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
