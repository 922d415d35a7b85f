//! Trading session window.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Weekday session in a fixed UTC offset.
///
/// The offset does not follow daylight saving; set it for the season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    /// Exchange offset from UTC in minutes (New York standard time is -300).
    pub utc_offset_minutes: i32,
    /// Ignore the window entirely (24/7 markets, replays).
    pub always_open: bool,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            utc_offset_minutes: -300,
            always_open: false,
        }
    }
}

impl MarketHours {
    pub fn always_open() -> Self {
        Self {
            always_open: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.open >= self.close {
            return Err(EngineError::InvalidConfig(format!(
                "market open {} must be before close {}",
                self.open, self.close
            )));
        }
        if self.offset().is_none() {
            return Err(EngineError::InvalidConfig(format!(
                "UTC offset out of range: {} minutes",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Whether `now` falls on a weekday with `open <= local time < close`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if self.always_open {
            return true;
        }
        let Some(offset) = self.offset() else {
            return false;
        };
        let local = now.with_timezone(&offset);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = local.time();
        self.open <= time && time < self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_session_window() {
        let hours = MarketHours::default();
        // Monday 2025-01-06, New York is UTC-5
        assert!(!hours.is_open(utc(2025, 1, 6, 14, 29)));
        assert!(hours.is_open(utc(2025, 1, 6, 14, 30)));
        assert!(hours.is_open(utc(2025, 1, 6, 20, 59)));
        assert!(!hours.is_open(utc(2025, 1, 6, 21, 0)));
    }

    #[test]
    fn test_weekend_is_closed_in_local_time() {
        let hours = MarketHours::default();
        // Saturday 2025-01-04 during session hours
        assert!(!hours.is_open(utc(2025, 1, 4, 15, 0)));

        // Friday evening in New York is already Saturday in UTC
        let late = MarketHours {
            close: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            ..MarketHours::default()
        };
        assert!(late.is_open(utc(2025, 1, 4, 2, 0)));
    }

    #[test]
    fn test_always_open() {
        assert!(MarketHours::always_open().is_open(utc(2025, 1, 5, 3, 0)));
    }

    #[test]
    fn test_validation() {
        assert!(MarketHours::default().validate().is_ok());
        let inverted = MarketHours {
            open: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            ..MarketHours::default()
        };
        assert!(inverted.validate().is_err());
        let offset = MarketHours {
            utc_offset_minutes: 24 * 60,
            ..MarketHours::default()
        };
        assert!(offset.validate().is_err());
    }
}
