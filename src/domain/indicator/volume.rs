//! Volume confirmation: current volume against SMA(volume, lookback).
//! The average includes the current bar.

use crate::domain::indicator::rolling::RollingWindow;
use crate::domain::indicator::VolumeStat;

#[derive(Debug, Clone)]
pub struct VolumeAverage {
    window: RollingWindow,
    multiplier: f64,
}

impl VolumeAverage {
    pub fn new(lookback: usize, multiplier: f64) -> Self {
        VolumeAverage {
            window: RollingWindow::new(lookback),
            multiplier,
        }
    }

    pub fn update(&mut self, volume: f64) -> Option<VolumeStat> {
        self.window.push(volume);
        let average = self.window.mean()?;
        Some(VolumeStat {
            current: volume,
            average,
            confirmed: volume >= average * self.multiplier,
        })
    }
}
