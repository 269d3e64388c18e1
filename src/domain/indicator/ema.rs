//! Exponential Moving Average accumulator.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: the first (n-1) values yield `None`.

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.count += 1;
        self.value = match self.value {
            Some(prev) => Some(x * self.k + prev * (1.0 - self.k)),
            None => {
                self.seed_sum += x;
                if self.count == self.period {
                    Some(self.seed_sum / self.period as f64)
                } else {
                    None
                }
            }
        };
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
