//! VWAP reversion: fades stretched moves away from the rolling VWAP.

use quant_core::{
    error::StrategyError,
    traits::{BarIndicator, ExitRules, Indicator, SignalStrategy, StrategyConfig},
    types::{closes, Bar, Signal},
};
use quant_indicators::{Atr, Rsi, SupportResistance, VolumeProfile, Vwap};
use serde::{Deserialize, Serialize};

use crate::scoring::{check_window, missing, ScoreCard, SignalGate};

pub const VWAP_REVERSION_ID: &str = "vwap_reversion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapReversionConfig {
    /// Bars the rolling VWAP is anchored over
    pub vwap_period: usize,
    pub atr_period: usize,
    /// Distance from VWAP, in ATRs, scoring 40 points
    pub extreme_deviation: f64,
    /// Distance from VWAP, in ATRs, scoring 25 points
    pub deviation: f64,
    pub rsi_period: usize,
    pub rsi_extreme_oversold: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_extreme_overbought: f64,
    pub level_lookback: usize,
    /// Close within this many ATRs of support/resistance
    pub level_proximity_atr: f64,
    pub volume_period: usize,
    pub min_volume_ratio: f64,
    pub exit: ExitRules,
    pub gate: SignalGate,
}

impl Default for VwapReversionConfig {
    fn default() -> Self {
        Self {
            vwap_period: 20,
            atr_period: 14,
            extreme_deviation: 2.0,
            deviation: 1.5,
            rsi_period: 14,
            rsi_extreme_oversold: 25.0,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            rsi_extreme_overbought: 75.0,
            level_lookback: 20,
            level_proximity_atr: 0.5,
            volume_period: 20,
            min_volume_ratio: 1.5,
            exit: ExitRules {
                stop_atr_multiplier: 1.5,
                reward_risk_ratio: 1.5,
                max_holding_bars: 5,
                ..ExitRules::default()
            },
            gate: SignalGate::default(),
        }
    }
}

impl StrategyConfig for VwapReversionConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.vwap_period == 0
            || self.atr_period == 0
            || self.rsi_period == 0
            || self.level_lookback == 0
            || self.volume_period == 0
        {
            return Err(StrategyError::InvalidConfig(
                "indicator periods must be positive".into(),
            ));
        }
        if !(self.deviation > 0.0 && self.deviation <= self.extreme_deviation) {
            return Err(StrategyError::InvalidConfig(
                "VWAP deviations must satisfy 0 < deviation <= extreme_deviation".into(),
            ));
        }
        if !(self.rsi_extreme_oversold <= self.rsi_oversold
            && self.rsi_oversold < self.rsi_overbought
            && self.rsi_overbought <= self.rsi_extreme_overbought)
        {
            return Err(StrategyError::InvalidConfig(
                "RSI levels are out of order".into(),
            ));
        }
        self.exit.validate()?;
        self.gate.validate()
    }
}

pub struct VwapReversionStrategy {
    config: VwapReversionConfig,
    vwap: Vwap,
    atr: Atr,
    rsi: Rsi,
    levels: SupportResistance,
    volume: VolumeProfile,
}

impl VwapReversionStrategy {
    pub fn new(config: VwapReversionConfig) -> Self {
        Self {
            vwap: Vwap::new(),
            atr: Atr::new(config.atr_period),
            rsi: Rsi::new(config.rsi_period),
            levels: SupportResistance::new(config.level_lookback),
            volume: VolumeProfile::new(config.volume_period, config.min_volume_ratio),
            config,
        }
    }

    pub fn config(&self) -> &VwapReversionConfig {
        &self.config
    }
}

impl Default for VwapReversionStrategy {
    fn default() -> Self {
        Self::new(VwapReversionConfig::default())
    }
}

impl SignalStrategy for VwapReversionStrategy {
    fn id(&self) -> &str {
        VWAP_REVERSION_ID
    }

    fn name(&self) -> &str {
        "VWAP Reversion"
    }

    fn description(&self) -> &str {
        "Fades closes stretched more than 1.5 ATR from the rolling VWAP"
    }

    fn warmup_period(&self) -> usize {
        self.config
            .vwap_period
            .max(self.atr.period())
            .max(self.rsi.period())
            .max(self.levels.period())
            .max(self.volume.period())
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

        let c = &self.config;
        let anchored = &bars[bars.len() - c.vwap_period..];
        let vwap = self.vwap.latest(anchored).ok_or_else(|| missing("VWAP"))?;
        let atr = self.atr.latest(bars).ok_or_else(|| missing("ATR"))?;
        let rsi = self.rsi.latest(&closes(bars)).ok_or_else(|| missing("RSI"))?;
        let levels = self.levels.latest(bars).ok_or_else(|| missing("support/resistance"))?;
        let volume = self.volume.latest(bars).ok_or_else(|| missing("volume profile"))?;

        if !(atr > 0.0) {
            return Ok(None);
        }
        let deviation = (last.close - vwap) / atr;

        let mut card = ScoreCard::new();
        card.record("vwap", vwap);
        card.record("vwap_deviation_atr", deviation);
        card.record("atr", atr);
        card.record("rsi", rsi);
        card.record("support", levels.support);
        card.record("resistance", levels.resistance);
        card.record("volume_ratio", volume.ratio);

        if deviation <= -c.extreme_deviation {
            card.buy(40.0, format!("close {:.1} ATR below VWAP", -deviation));
        } else if deviation <= -c.deviation {
            card.buy(25.0, format!("close {:.1} ATR below VWAP", -deviation));
        } else if deviation >= c.extreme_deviation {
            card.sell(40.0, format!("close {:.1} ATR above VWAP", deviation));
        } else if deviation >= c.deviation {
            card.sell(25.0, format!("close {:.1} ATR above VWAP", deviation));
        }

        if rsi < c.rsi_extreme_oversold {
            card.buy(30.0, format!("RSI {:.1} deeply oversold", rsi));
        } else if rsi < c.rsi_oversold {
            card.buy(20.0, format!("RSI {:.1} oversold", rsi));
        } else if rsi > c.rsi_extreme_overbought {
            card.sell(30.0, format!("RSI {:.1} deeply overbought", rsi));
        } else if rsi > c.rsi_overbought {
            card.sell(20.0, format!("RSI {:.1} overbought", rsi));
        }

        let proximity = c.level_proximity_atr * atr;
        if last.close - levels.support <= proximity {
            card.buy(20.0, format!("close near support {:.2}", levels.support));
        }
        if levels.resistance - last.close <= proximity {
            card.sell(20.0, format!("close near resistance {:.2}", levels.resistance));
        }

        if volume.ratio >= c.min_volume_ratio {
            card.confirm(10.0, format!("volume {:.1}x average", volume.ratio));
        }

        Ok(card.into_signal(self.id(), symbol, last, atr, &c.exit, &c.gate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_core::types::SignalDirection;
    use quant_data::scenarios::{overbought_blowoff, oversold_capitulation, quiet_market};

    #[test]
    fn test_stretched_below_vwap_buys() {
        let strategy = VwapReversionStrategy::default();
        let signal = strategy.evaluate("QQQ", &oversold_capitulation()).unwrap().unwrap();

        assert_eq!(signal.direction, SignalDirection::Buy);
        assert_eq!(signal.confidence, 100.0);
        assert!(signal.indicators["vwap_deviation_atr"] <= -2.0);
        assert!(signal.price < signal.indicators["vwap"]);
    }

    #[test]
    fn test_stretched_above_vwap_sells() {
        let strategy = VwapReversionStrategy::default();
        let signal = strategy.evaluate("QQQ", &overbought_blowoff()).unwrap().unwrap();
        assert_eq!(signal.direction, SignalDirection::Sell);
    }

    #[test]
    fn test_price_at_vwap_is_quiet() {
        let strategy = VwapReversionStrategy::default();
        assert_eq!(strategy.warmup_period(), 21);
        assert!(strategy.evaluate("QQQ", &quiet_market(60)).unwrap().is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(VwapReversionConfig::default().validate().is_ok());
        let bad = VwapReversionConfig {
            deviation: 3.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
