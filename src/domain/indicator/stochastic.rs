//! Stochastic oscillator accumulator.
//!
//! %K = 100 × (close - lowest_low(k)) / (highest_high(k) - lowest_low(k)),
//! 50 when the range is flat.
//! %D = SMA(%K, d).
//! Warmup: k - 1 + d - 1 bars undefined.

use crate::domain::bar::Bar;
use crate::domain::indicator::rolling::RollingWindow;
use crate::domain::indicator::StochasticValue;

const FLAT_RANGE_K: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Stochastic {
    highs: RollingWindow,
    lows: RollingWindow,
    d_window: RollingWindow,
    prev_k: Option<f64>,
    prev_d: Option<f64>,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        Stochastic {
            highs: RollingWindow::new(k_period),
            lows: RollingWindow::new(k_period),
            d_window: RollingWindow::new(d_period),
            prev_k: None,
            prev_d: None,
        }
    }

    pub fn update(&mut self, bar: &Bar) -> Option<StochasticValue> {
        self.highs.push(bar.high);
        self.lows.push(bar.low);
        let highest = self.highs.max()?;
        let lowest = self.lows.min()?;

        let range = highest - lowest;
        let k = if range == 0.0 {
            FLAT_RANGE_K
        } else {
            100.0 * (bar.close - lowest) / range
        };
        self.d_window.push(k);
        let d = self.d_window.mean();

        let value = d.map(|d| StochasticValue {
            k,
            d,
            prev_k: self.prev_k,
            prev_d: self.prev_d,
        });
        self.prev_k = Some(k);
        self.prev_d = d;
        value
    }
}
