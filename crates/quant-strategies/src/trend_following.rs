//! Trend following on a fast/slow EMA pair.
//!
//! A fresh crossover scores highest; an established trend scores less.
//! MACD and RSI confirm the direction, and a close near the slow EMA
//! (a pullback entry) or firm volume adds confirmation.

use quant_core::{
    error::StrategyError,
    traits::{BarIndicator, ExitRules, Indicator, MultiOutputIndicator, SignalStrategy, StrategyConfig},
    types::{closes, Bar, Signal},
};
use quant_indicators::{Atr, Ema, Macd, Rsi, VolumeProfile};
use serde::{Deserialize, Serialize};

use crate::scoring::{check_window, missing, ScoreCard, SignalGate};

pub const TREND_FOLLOWING_ID: &str = "trend_following";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendFollowingConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    /// A cross within this many bars counts as fresh
    pub cross_lookback: usize,
    /// Minimum |fast - slow| / slow for the pair to count as separated
    pub min_spread: f64,
    pub rsi_period: usize,
    pub rsi_bull_range: (f64, f64),
    pub rsi_bear_range: (f64, f64),
    pub atr_period: usize,
    /// Close within this many ATRs of the slow EMA is a pullback entry
    pub pullback_atr: f64,
    pub volume_period: usize,
    pub min_volume_ratio: f64,
    pub exit: ExitRules,
    pub gate: SignalGate,
}

impl Default for TrendFollowingConfig {
    fn default() -> Self {
        Self {
            fast_period: 9,
            slow_period: 21,
            cross_lookback: 3,
            min_spread: 0.0005,
            rsi_period: 14,
            rsi_bull_range: (50.0, 70.0),
            rsi_bear_range: (30.0, 50.0),
            atr_period: 14,
            pullback_atr: 1.0,
            volume_period: 20,
            min_volume_ratio: 1.2,
            exit: ExitRules {
                stop_atr_multiplier: 2.5,
                reward_risk_ratio: 3.0,
                max_holding_bars: 30,
                ..ExitRules::default()
            },
            gate: SignalGate::default(),
        }
    }
}

impl StrategyConfig for TrendFollowingConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if self.cross_lookback == 0 || self.rsi_period == 0 || self.atr_period == 0 || self.volume_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "indicator periods must be positive".into(),
            ));
        }
        if !(self.min_spread >= 0.0) || !(self.pullback_atr >= 0.0) {
            return Err(StrategyError::InvalidConfig(
                "spread and pullback distances must be non-negative".into(),
            ));
        }
        let (bull_lo, bull_hi) = self.rsi_bull_range;
        let (bear_lo, bear_hi) = self.rsi_bear_range;
        if bull_lo > bull_hi || bear_lo > bear_hi {
            return Err(StrategyError::InvalidConfig(
                "RSI ranges must be (low, high)".into(),
            ));
        }
        self.exit.validate()?;
        self.gate.validate()
    }
}

pub struct TrendFollowingStrategy {
    config: TrendFollowingConfig,
    fast: Ema,
    slow: Ema,
    macd: Macd,
    rsi: Rsi,
    atr: Atr,
    volume: VolumeProfile,
}

impl TrendFollowingStrategy {
    pub fn new(config: TrendFollowingConfig) -> Self {
        Self {
            fast: Ema::new(config.fast_period),
            slow: Ema::new(config.slow_period),
            macd: Macd::new(),
            rsi: Rsi::new(config.rsi_period),
            atr: Atr::new(config.atr_period),
            volume: VolumeProfile::new(config.volume_period, config.min_volume_ratio),
            config,
        }
    }

    pub fn config(&self) -> &TrendFollowingConfig {
        &self.config
    }
}

impl Default for TrendFollowingStrategy {
    fn default() -> Self {
        Self::new(TrendFollowingConfig::default())
    }
}

impl SignalStrategy for TrendFollowingStrategy {
    fn id(&self) -> &str {
        TREND_FOLLOWING_ID
    }

    fn name(&self) -> &str {
        "Trend Following"
    }

    fn description(&self) -> &str {
        "Enters on fresh EMA crossovers and pullbacks within an established trend"
    }

    fn warmup_period(&self) -> usize {
        (self.slow.period() + self.config.cross_lookback)
            .max(self.macd.period())
            .max(self.rsi.period())
            .max(self.atr.period())
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

        let closes = closes(bars);
        let slow = self.slow.calculate(&closes);
        let fast = self.fast.calculate(&closes);
        let lookback = self.config.cross_lookback;
        if slow.len() <= lookback || fast.len() < slow.len() {
            return Err(missing("EMA"));
        }
        // Align the fast series on the slow one
        let fast = &fast[fast.len() - slow.len()..];
        let n = slow.len();
        let (fast_now, slow_now) = (fast[n - 1], slow[n - 1]);
        let mut prior = fast[n - 1 - lookback..n - 1].iter().zip(&slow[n - 1 - lookback..n - 1]);

        let macd = self.macd.latest(&closes).ok_or_else(|| missing("MACD"))?;
        let rsi = self.rsi.latest(&closes).ok_or_else(|| missing("RSI"))?;
        let atr = self.atr.latest(bars).ok_or_else(|| missing("ATR"))?;
        let volume = self.volume.latest(bars).ok_or_else(|| missing("volume profile"))?;
        let c = &self.config;

        let spread = if slow_now != 0.0 {
            (fast_now - slow_now).abs() / slow_now.abs()
        } else {
            0.0
        };
        let separated = spread >= c.min_spread;

        let mut card = ScoreCard::new();
        card.record("ema_fast", fast_now);
        card.record("ema_slow", slow_now);
        card.record("ema_spread", spread);
        card.record("macd", macd.macd);
        card.record("macd_signal", macd.signal);
        card.record("rsi", rsi);
        card.record("atr", atr);
        card.record("volume_ratio", volume.ratio);

        if separated && fast_now > slow_now {
            if prior.any(|(f, s)| f <= s) {
                card.buy(40.0, format!("EMA {} crossed above EMA {}", c.fast_period, c.slow_period));
            } else if last.close > slow_now {
                card.buy(15.0, "uptrend intact");
            }
        } else if separated && fast_now < slow_now {
            if prior.any(|(f, s)| f >= s) {
                card.sell(40.0, format!("EMA {} crossed below EMA {}", c.fast_period, c.slow_period));
            } else if last.close < slow_now {
                card.sell(15.0, "downtrend intact");
            }
        }

        if macd.macd > macd.signal {
            card.buy(20.0, "MACD above signal");
        } else if macd.macd < macd.signal {
            card.sell(20.0, "MACD below signal");
        }

        let (bull_lo, bull_hi) = c.rsi_bull_range;
        let (bear_lo, bear_hi) = c.rsi_bear_range;
        if (bull_lo..=bull_hi).contains(&rsi) {
            card.buy(15.0, format!("RSI {:.1} bullish", rsi));
        } else if (bear_lo..bear_hi).contains(&rsi) {
            card.sell(15.0, format!("RSI {:.1} bearish", rsi));
        }

        if (last.close - slow_now).abs() <= c.pullback_atr * atr {
            card.confirm(15.0, format!("close within {:.1} ATR of EMA {}", c.pullback_atr, c.slow_period));
        }
        if volume.ratio >= c.min_volume_ratio {
            card.confirm(10.0, format!("volume {:.1}x average", volume.ratio));
        }

        Ok(card.into_signal(self.id(), symbol, last, atr, &c.exit, &c.gate))
    }
}
