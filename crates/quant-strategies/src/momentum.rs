//! Momentum breakout.
//!
//! Buys when an accelerating MACD histogram coincides with a close above
//! the prior range high, sells on the mirror image. Exhausted RSI readings
//! count against the move.

use quant_core::{
    error::StrategyError,
    traits::{BarIndicator, ExitRules, Indicator, MultiOutputIndicator, SignalStrategy, StrategyConfig},
    types::{closes, Bar, Signal},
};
use quant_indicators::{Atr, Macd, Rsi, SupportResistance, VolumeProfile};
use serde::{Deserialize, Serialize};

use crate::scoring::{check_window, missing, ScoreCard, SignalGate};

pub const MOMENTUM_BREAKOUT_ID: &str = "momentum_breakout";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Bars forming the range a close must break out of
    pub breakout_lookback: usize,
    pub rsi_period: usize,
    /// RSI band that confirms an up move
    pub rsi_bull_range: (f64, f64),
    /// RSI band that confirms a down move
    pub rsi_bear_range: (f64, f64),
    /// RSI above this penalises buys
    pub rsi_exhausted_high: f64,
    /// RSI below this penalises sells
    pub rsi_exhausted_low: f64,
    pub volume_period: usize,
    pub high_volume_ratio: f64,
    pub elevated_volume_ratio: f64,
    pub atr_period: usize,
    pub exit: ExitRules,
    pub gate: SignalGate,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            breakout_lookback: 20,
            rsi_period: 14,
            rsi_bull_range: (50.0, 75.0),
            rsi_bear_range: (25.0, 50.0),
            rsi_exhausted_high: 80.0,
            rsi_exhausted_low: 20.0,
            volume_period: 20,
            high_volume_ratio: 2.5,
            elevated_volume_ratio: 1.5,
            atr_period: 14,
            exit: ExitRules {
                stop_atr_multiplier: 1.5,
                reward_risk_ratio: 2.5,
                max_holding_bars: 15,
                ..ExitRules::default()
            },
            gate: SignalGate::default(),
        }
    }
}

impl StrategyConfig for MomentumConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.macd_fast == 0 || self.macd_signal == 0 {
            return Err(StrategyError::InvalidConfig(
                "MACD periods must be positive".into(),
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(StrategyError::InvalidConfig(
                "MACD fast period must be less than slow period".into(),
            ));
        }
        if self.breakout_lookback == 0
            || self.rsi_period == 0
            || self.volume_period == 0
            || self.atr_period == 0
        {
            return Err(StrategyError::InvalidConfig(
                "indicator periods must be positive".into(),
            ));
        }
        let (bull_lo, bull_hi) = self.rsi_bull_range;
        let (bear_lo, bear_hi) = self.rsi_bear_range;
        if bull_lo > bull_hi || bear_lo > bear_hi {
            return Err(StrategyError::InvalidConfig(
                "RSI ranges must be (low, high)".into(),
            ));
        }
        if self.rsi_exhausted_low >= self.rsi_exhausted_high {
            return Err(StrategyError::InvalidConfig(
                "RSI exhaustion levels are inverted".into(),
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

pub struct MomentumStrategy {
    config: MomentumConfig,
    macd: Macd,
    range: SupportResistance,
    rsi: Rsi,
    volume: VolumeProfile,
    atr: Atr,
}

impl MomentumStrategy {
    /// Build from a configuration; call [`StrategyConfig::validate`] first
    /// when the values come from outside.
    pub fn new(config: MomentumConfig) -> Self {
        Self {
            macd: Macd::with_periods(config.macd_fast, config.macd_slow, config.macd_signal),
            range: SupportResistance::new(config.breakout_lookback),
            rsi: Rsi::new(config.rsi_period),
            volume: VolumeProfile::new(config.volume_period, config.high_volume_ratio),
            atr: Atr::new(config.atr_period),
            config,
        }
    }

    pub fn config(&self) -> &MomentumConfig {
        &self.config
    }
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self::new(MomentumConfig::default())
    }
}

impl SignalStrategy for MomentumStrategy {
    fn id(&self) -> &str {
        MOMENTUM_BREAKOUT_ID
    }

    fn name(&self) -> &str {
        "Momentum Breakout"
    }

    fn description(&self) -> &str {
        "Trades range breakouts confirmed by MACD acceleration and volume"
    }

    fn warmup_period(&self) -> usize {
        // Two histogram values, and a full range before the last bar
        (self.macd.period() + 1)
            .max(self.range.period() + 1)
            .max(self.rsi.period())
            .max(self.volume.period())
            .max(self.atr.period())
    }

    fn exit_rules(&self) -> ExitRules {
        self.config.exit
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Option<Signal>, StrategyError> {
        let Some((last, history)) = bars.split_last() else {
            return Ok(None);
        };
        if !self.is_warmed_up(bars.len()) {
            return Ok(None);
        }
        check_window(bars)?;

        let closes = closes(bars);
        let macd = self.macd.calculate(&closes);
        let (now, prev) = match macd.as_slice() {
            [.., prev, now] => (*now, *prev),
            _ => return Err(missing("MACD")),
        };
        let range = self.range.latest(history).ok_or_else(|| missing("support/resistance"))?;
        let rsi = self.rsi.latest(&closes).ok_or_else(|| missing("RSI"))?;
        let volume = self.volume.latest(bars).ok_or_else(|| missing("volume profile"))?;
        let atr = self.atr.latest(bars).ok_or_else(|| missing("ATR"))?;
        let c = &self.config;

        let mut card = ScoreCard::new();
        card.record("macd", now.macd);
        card.record("macd_signal", now.signal);
        card.record("macd_histogram", now.histogram);
        card.record("resistance", range.resistance);
        card.record("support", range.support);
        card.record("rsi", rsi);
        card.record("volume_ratio", volume.ratio);
        card.record("atr", atr);

        if now.histogram > 0.0 && now.histogram > prev.histogram {
            card.buy(30.0, format!("MACD histogram rising at {:.3}", now.histogram));
        } else if now.histogram < 0.0 && now.histogram < prev.histogram {
            card.sell(30.0, format!("MACD histogram falling at {:.3}", now.histogram));
        }

        if now.macd > 0.0 {
            card.buy(10.0, "MACD above zero");
        } else if now.macd < 0.0 {
            card.sell(10.0, "MACD below zero");
        }

        if last.close > range.resistance {
            card.buy(35.0, format!("close {:.2} broke resistance {:.2}", last.close, range.resistance));
        } else if last.close < range.support {
            card.sell(35.0, format!("close {:.2} broke support {:.2}", last.close, range.support));
        }

        let (bull_lo, bull_hi) = c.rsi_bull_range;
        let (bear_lo, bear_hi) = c.rsi_bear_range;
        if (bull_lo..=bull_hi).contains(&rsi) {
            card.buy(10.0, format!("RSI {:.1} supports upside", rsi));
        } else if (bear_lo..bear_hi).contains(&rsi) {
            card.sell(10.0, format!("RSI {:.1} supports downside", rsi));
        }
        if rsi > c.rsi_exhausted_high {
            card.buy(-20.0, format!("RSI {:.1} exhausted", rsi));
        } else if rsi < c.rsi_exhausted_low {
            card.sell(-20.0, format!("RSI {:.1} exhausted", rsi));
        }

        if volume.ratio >= c.high_volume_ratio {
            card.confirm(25.0, format!("volume {:.1}x average", volume.ratio));
        } else if volume.ratio >= c.elevated_volume_ratio {
            card.confirm(15.0, format!("volume {:.1}x average", volume.ratio));
        }

        Ok(card.into_signal(self.id(), symbol, last, atr, &c.exit, &c.gate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_core::types::SignalDirection;
    use quant_data::scenarios::{breakdown, breakout, quiet_market};

    #[test]
    fn test_breakout_buy() {
        let strategy = MomentumStrategy::default();
        let bars = breakout();

        let signal = strategy.evaluate("NVDA", &bars).unwrap().unwrap();
        assert_eq!(signal.direction, SignalDirection::Buy);
        assert!(signal.confidence >= 70.0);
        assert!(signal.price > signal.indicators["resistance"]);
        assert!(signal.indicators["macd_histogram"] > 0.0);
        assert_eq!(signal.strategy_id, MOMENTUM_BREAKOUT_ID);
    }

    #[test]
    fn test_breakdown_sell() {
        let strategy = MomentumStrategy::default();
        let signal = strategy.evaluate("NVDA", &breakdown()).unwrap().unwrap();
        assert_eq!(signal.direction, SignalDirection::Sell);
        assert!(signal.price < signal.indicators["support"]);
    }

    #[test]
    fn test_exhausted_rsi_lowers_confidence() {
        // The breakout bar pushes RSI above 80, costing 20 points
        let strategy = MomentumStrategy::default();
        let signal = strategy.evaluate("NVDA", &breakout()).unwrap().unwrap();
        assert!(signal.indicators["rsi"] > 80.0);
        assert_eq!(signal.confidence, 80.0);
    }

    #[test]
    fn test_quiet_market_has_no_signal() {
        let strategy = MomentumStrategy::default();
        assert!(strategy.evaluate("NVDA", &quiet_market(60)).unwrap().is_none());
    }

    #[test]
    fn test_warmup() {
        let strategy = MomentumStrategy::default();
        assert_eq!(strategy.warmup_period(), 35);
        assert!(strategy.evaluate("NVDA", &breakout()[..34]).unwrap().is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(MomentumConfig::default().validate().is_ok());
        let bad = MomentumConfig {
            macd_fast: 30,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
