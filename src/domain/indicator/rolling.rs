//! Fixed-length rolling window with running sums.
//!
//! SMA(n) = sum / n
//! Population variance = sum_sq / n - mean^2 (clamped at 0 against rounding).
//! Each push is O(1); the window is undefined until n values have been pushed.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        RollingWindow {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
    }

    pub fn is_full(&self) -> bool {
        self.period > 0 && self.values.len() == self.period
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    pub fn population_stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = (self.sum_sq / self.period as f64 - mean * mean).max(0.0);
        Some(variance.sqrt())
    }

    pub fn max(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.values.iter().copied().reduce(f64::min)
    }
}
