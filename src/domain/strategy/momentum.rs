//! Trend-following entries on a bullish MACD histogram cross.

use crate::domain::indicator::IndicatorSnapshot;

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_EXIT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Momentum;

impl Momentum {
    /// All of:
    /// - MACD histogram crosses up through zero (prev ≤ 0, current > 0)
    /// - RSI below 70
    /// - close above the upper band, or inside the bands with a rising middle
    /// - volume confirmed
    pub fn should_enter(&self, snap: &IndicatorSnapshot) -> bool {
        let (Some(rsi), Some(macd), Some(bb)) = (snap.rsi, snap.macd, snap.bollinger) else {
            return false;
        };

        let crossed_up = macd.prev_histogram.is_some_and(|p| p <= 0.0) && macd.histogram > 0.0;
        let breakout = snap.close > bb.upper;
        let rising_inside = snap.close >= bb.lower
            && snap.close <= bb.upper
            && bb.prev_middle.is_some_and(|p| bb.middle > p);

        crossed_up && rsi < RSI_OVERBOUGHT && (breakout || rising_inside) && snap.volume_confirmed()
    }

    /// MACD histogram crosses down through zero, or RSI above 80.
    pub fn should_exit(&self, snap: &IndicatorSnapshot) -> bool {
        let crossed_down = snap
            .macd
            .is_some_and(|m| m.prev_histogram.is_some_and(|p| p > 0.0) && m.histogram <= 0.0);
        let overheated = snap.rsi.is_some_and(|r| r > RSI_EXIT);
        crossed_down || overheated
    }
}
