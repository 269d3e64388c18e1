//! RSI (Relative Strength Index) accumulator.
//!
//! Uses Wilder's smoothing for average gain/loss:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: undefined for the first n bars (bar index i < n).

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Rsi {
            period,
            prev_close: None,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        if self.period == 0 {
            return None;
        }

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes += 1;
        let n = self.period as f64;

        if self.changes <= self.period {
            // seed phase: accumulate, divide once the first n changes are in
            self.avg_gain += gain;
            self.avg_loss += loss;
            if self.changes < self.period {
                return None;
            }
            self.avg_gain /= n;
            self.avg_loss /= n;
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }

        Some(if self.avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + self.avg_gain / self.avg_loss))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(prices: &[f64], period: usize) -> Vec<Option<f64>> {
        let mut rsi = Rsi::new(period);
        prices.iter().map(|&p| rsi.update(p)).collect()
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let out = run(&prices, 14);
        for (i, v) in out.iter().enumerate().take(14) {
            assert!(v.is_none(), "bar {} should be undefined", i);
        }
        assert!(out[14].is_some());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let out = run(&prices, 14);
        assert!((out[14].unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let out = run(&prices, 14);
        assert!(out[14].unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_wilder_smoothing_by_hand() {
        // changes: +1, -2, -1, -1
        let out = run(&[100.0, 101.0, 99.0, 98.0, 97.0], 3);
        let seed_gain = 1.0 / 3.0;
        let seed_loss = 3.0 / 3.0;
        let first = 100.0 - 100.0 / (1.0 + seed_gain / seed_loss);
        assert!((out[3].unwrap() - first).abs() < 1e-12);

        let gain = seed_gain * 2.0 / 3.0;
        let loss = (seed_loss * 2.0 + 1.0) / 3.0;
        let second = 100.0 - 100.0 / (1.0 + gain / loss);
        assert!((out[4].unwrap() - second).abs() < 1e-12);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=60)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        for v in run(&prices, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {} out of range", v);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let out = run(&[100.0, 101.0, 102.0], 0);
        assert!(out.iter().all(Option::is_none));
    }
}
