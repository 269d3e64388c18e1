//! Bollinger Bands accumulator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//! - Bandwidth: (Upper - Lower) / Middle
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::rolling::RollingWindow;
use crate::domain::indicator::BollingerValue;

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: RollingWindow,
    multiplier: f64,
    prev_middle: Option<f64>,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Bollinger {
            window: RollingWindow::new(period),
            multiplier,
            prev_middle: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<BollingerValue> {
        self.window.push(close);
        let middle = self.window.mean()?;
        let stddev = self.window.population_stddev()?;
        let upper = middle + self.multiplier * stddev;
        let lower = middle - self.multiplier * stddev;
        let bandwidth = if middle != 0.0 {
            (upper - lower) / middle
        } else {
            0.0
        };
        let value = BollingerValue {
            upper,
            middle,
            lower,
            bandwidth,
            prev_middle: self.prev_middle,
        };
        self.prev_middle = Some(middle);
        Some(value)
    }
}
