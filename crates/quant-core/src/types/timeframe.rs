//! Bar timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Trading days in a year, used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Regular-session minutes in a trading day.
const SESSION_MINUTES: f64 = 390.0;

/// Timeframe for bars/candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    #[default]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Daily,
        Timeframe::Weekly,
    ];

    /// Bar duration in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Minute30 => 1800,
            Timeframe::Hour1 => 3600,
            Timeframe::Daily => 86400,
            Timeframe::Weekly => 604800,
        }
    }

    /// Short label, matching the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        }
    }

    pub fn as_millis(&self) -> i64 {
        self.as_secs() as i64 * 1000
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Timeframe::Daily | Timeframe::Weekly)
    }

    /// Number of bars of this timeframe in a trading year.
    ///
    /// Intraday bars count regular-session bars only.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Timeframe::Daily => TRADING_DAYS_PER_YEAR,
            Timeframe::Weekly => 52.0,
            intraday => {
                let minutes = intraday.as_secs() as f64 / 60.0;
                (SESSION_MINUTES / minutes).floor() * TRADING_DAYS_PER_YEAR
            }
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if let Some(tf) = Self::ALL.into_iter().find(|tf| tf.label() == lowered) {
            return Ok(tf);
        }
        match lowered.as_str() {
            "1min" | "minute" => Ok(Timeframe::Minute1),
            "5min" => Ok(Timeframe::Minute5),
            "15min" => Ok(Timeframe::Minute15),
            "30min" => Ok(Timeframe::Minute30),
            "1hour" | "hour" => Ok(Timeframe::Hour1),
            "day" | "daily" => Ok(Timeframe::Daily),
            "week" | "weekly" => Ok(Timeframe::Weekly),
            _ => Err(DataError::InvalidTimeframe(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse_and_display() {
        assert_eq!("1d".parse::<Timeframe>().ok(), Some(Timeframe::Daily));
        assert_eq!("15MIN".parse::<Timeframe>().ok(), Some(Timeframe::Minute15));
        assert!("3d".parse::<Timeframe>().is_err());
        assert_eq!(Timeframe::Hour1.to_string(), "1h");
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>().ok(), Some(tf));
        }
    }

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Timeframe::Daily.periods_per_year(), 252.0);
        assert_eq!(Timeframe::Weekly.periods_per_year(), 52.0);
        // 390 / 30 = 13 bars per session
        assert_eq!(Timeframe::Minute30.periods_per_year(), 13.0 * 252.0);
        // 390 / 60 = 6.5, floored to 6
        assert_eq!(Timeframe::Hour1.periods_per_year(), 6.0 * 252.0);
    }

    #[test]
    fn test_is_intraday() {
        assert!(Timeframe::Minute1.is_intraday());
        assert!(!Timeframe::Daily.is_intraday());
    }
}
