//! Oversold bounce entries at the lower Bollinger band.

use crate::domain::indicator::IndicatorSnapshot;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const STOCH_OVERSOLD: f64 = 20.0;
pub const RSI_EXIT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeanReversion;

impl MeanReversion {
    /// All of: close at or below the lower band, RSI below 30, %K crossing
    /// above %D from under 20, and volume confirmed.
    pub fn should_enter(&self, snap: &IndicatorSnapshot) -> bool {
        let (Some(rsi), Some(bb), Some(st)) = (snap.rsi, snap.bollinger, snap.stochastic) else {
            return false;
        };

        let stoch_cross = match (st.prev_k, st.prev_d) {
            (Some(pk), Some(pd)) => pk < STOCH_OVERSOLD && pk <= pd && st.k > st.d,
            _ => false,
        };

        snap.close <= bb.lower && rsi < RSI_OVERSOLD && stoch_cross && snap.volume_confirmed()
    }

    /// Close back at the middle band, or RSI above 50.
    pub fn should_exit(&self, snap: &IndicatorSnapshot) -> bool {
        snap.bollinger.is_some_and(|bb| snap.close >= bb.middle)
            || snap.rsi.is_some_and(|r| r > RSI_EXIT)
    }
}
