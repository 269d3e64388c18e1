//! MACD (Moving Average Convergence Divergence) accumulator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded by the SMA of its first `signal` values
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: slow - 1 + signal - 1 bars undefined.

use crate::domain::indicator::ema::Ema;
use crate::domain::indicator::MacdValue;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    prev_histogram: Option<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Macd {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            prev_histogram: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<MacdValue> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let line = fast? - slow?;
        let signal = self.signal.update(line)?;
        let histogram = line - signal;
        let value = MacdValue {
            line,
            signal,
            histogram,
            prev_histogram: self.prev_histogram,
        };
        self.prev_histogram = Some(histogram);
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn macd_warmup_default() {
        let mut macd = Macd::new(12, 26, 9);
        let out: Vec<_> = trending(40).into_iter().map(|p| macd.update(p)).collect();
        let warmup = 26 - 1 + 9 - 1;
        for (i, v) in out.iter().enumerate().take(warmup) {
            assert!(v.is_none(), "index {} should be undefined", i);
        }
        assert!(out[warmup].is_some());
    }

    #[test]
    fn histogram_equals_line_minus_signal() {
        let mut macd = Macd::new(3, 5, 2);
        for p in trending(20) {
            if let Some(v) = macd.update(p) {
                assert!((v.histogram - (v.line - v.signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn line_is_fast_minus_slow() {
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0];
        let mut macd = Macd::new(2, 3, 1);
        let mut fast = Ema::new(2);
        let mut slow = Ema::new(3);
        for p in prices {
            let f = fast.update(p);
            let s = slow.update(p);
            if let Some(v) = macd.update(p) {
                assert!((v.line - (f.unwrap() - s.unwrap())).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn previous_histogram_is_carried() {
        let mut macd = Macd::new(2, 3, 2);
        let values: Vec<MacdValue> = [10.0, 11.0, 13.0, 12.0, 9.0, 8.0]
            .into_iter()
            .filter_map(|p| macd.update(p))
            .collect();
        assert!(values[0].prev_histogram.is_none());
        for pair in values.windows(2) {
            assert_eq!(pair[1].prev_histogram, Some(pair[0].histogram));
        }
    }
}
