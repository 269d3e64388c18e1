//! OHLCV bar and chart interval.

use chrono::{Duration, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// One closed OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Chart interval supported by the exchange's minute candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Minute1,
    Minute3,
    Minute5,
    Minute15,
    Minute30,
    Minute60,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::Minute1,
        Interval::Minute3,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Minute60,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            Interval::Minute1 => 1,
            Interval::Minute3 => 3,
            Interval::Minute5 => 5,
            Interval::Minute15 => 15,
            Interval::Minute30 => 30,
            Interval::Minute60 => 60,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    pub fn from_minutes(minutes: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.minutes() == minutes)
    }

    /// Bars per year for a market that trades around the clock.
    pub fn periods_per_year(self) -> f64 {
        365.0 * 24.0 * 60.0 / self.minutes() as f64
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "minute{}", self.minutes())
    }
}

impl FromStr for Interval {
    type Err = String;

    /// Accepts `15`, `15m` and `minute15`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let digits = trimmed
            .strip_prefix("minute")
            .or_else(|| trimmed.strip_suffix('m'))
            .unwrap_or(&trimmed);
        let minutes: i64 = digits
            .parse()
            .map_err(|_| format!("unrecognised interval '{}'", s))?;
        Interval::from_minutes(minutes)
            .ok_or_else(|| format!("interval must be one of 1/3/5/15/30/60 minutes, got {}", s))
    }
}
