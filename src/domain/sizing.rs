//! Entry sizing.
//!
//! notional = cash × position_size / (1 + fee_rate), so that cost plus fee fits in cash.
//! With risk_per_trade > 0 the quantity is also capped so that a stop-out
//! loses at most cash × risk_per_trade:
//!   risk_qty = cash × risk_per_trade / (price × stop_loss_pct)
//! Orders below `min_order_value` are not placed.

use crate::domain::config::RunConfig;

pub fn position_quantity(
    cash: f64,
    price: f64,
    stop_loss_pct: f64,
    config: &RunConfig,
) -> Option<f64> {
    if cash <= 0.0 || price <= 0.0 || !price.is_finite() {
        return None;
    }

    let notional = cash * config.position_size / (1.0 + config.fee_rate);
    let mut quantity = notional / price;

    if config.risk_per_trade > 0.0 && stop_loss_pct > 0.0 {
        let risk_qty = cash * config.risk_per_trade / (price * stop_loss_pct);
        quantity = quantity.min(risk_qty);
    }

    if quantity * price < config.min_order_value || quantity <= 0.0 {
        return None;
    }
    Some(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> RunConfig {
        RunConfig {
            fee_rate: 0.0,
            position_size: 1.0,
            risk_per_trade: 0.0,
            min_order_value: 5000.0,
            ..RunConfig::default()
        }
    }

    #[test]
    fn all_in_without_fees() {
        let q = position_quantity(1_000_000.0, 50_000.0, 0.012, &config()).unwrap();
        assert_relative_eq!(q, 20.0);
    }

    #[test]
    fn leaves_room_for_fee() {
        let cfg = RunConfig {
            fee_rate: 0.0005,
            ..config()
        };
        let q = position_quantity(1_000_000.0, 50_000.0, 0.012, &cfg).unwrap();
        let cost = q * 50_000.0 * (1.0 + cfg.fee_rate);
        assert_relative_eq!(cost, 1_000_000.0, max_relative = 1e-12);
    }

    #[test]
    fn risk_cap_limits_quantity() {
        let cfg = RunConfig {
            risk_per_trade: 0.01,
            ..config()
        };
        // risk 10_000 over a 5% stop on a 100 price → 2000 units (200_000 notional)
        let q = position_quantity(1_000_000.0, 100.0, 0.05, &cfg).unwrap();
        assert_relative_eq!(q, 2000.0);
    }

    #[test]
    fn below_minimum_order_is_skipped() {
        assert!(position_quantity(4_000.0, 100.0, 0.05, &config()).is_none());
    }

    #[test]
    fn no_cash_no_order() {
        assert!(position_quantity(0.0, 100.0, 0.05, &config()).is_none());
        assert!(position_quantity(10_000.0, 0.0, 0.05, &config()).is_none());
    }
}
