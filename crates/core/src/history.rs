//! Mark-to-market and per-bar history rows.

use crate::market::{MarketState, MarketType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One snapshot of a market state after a bar has been processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub close: f64,
    pub position: f64,
    pub average_cost: f64,
    pub balance: f64,
    pub leverage: f64,
    pub unrealized_profit: f64,
    pub realized_profit: f64,
    pub profit: f64,
    /// Balance plus unrealized profit, the equity curve input.
    pub ubalance: f64,
    pub weight: i32,
    /// Profit had the position been closed at the bar's adverse extreme.
    pub max_loss: f64,
    /// Profit had the position been closed at the bar's favorable extreme.
    pub max_profit: f64,
}

/// Revalue a market state against its current bar close.
///
/// Updates unrealized profit, total profit, and leverage in place. All
/// divisions are guarded so a zero balance or price marks to zero rather
/// than propagating NaN into the history.
pub fn mark(state: &mut MarketState) {
    let close = state.bar.close;
    state.unrealized_profit = unrealized_at(state, close);
    state.profit = state.unrealized_profit + state.realized_profit;
    state.leverage = leverage_at(state, close);
}

/// Unrealized profit if the whole position were closed at `price`.
#[must_use]
pub fn unrealized_at(state: &MarketState, price: f64) -> f64 {
    if state.position == 0.0 || state.average_cost == 0.0 || price <= 0.0 {
        return 0.0;
    }
    match state.info.market_type {
        MarketType::Future => {
            let pct = if state.position > 0.0 {
                (price - state.average_cost) / state.average_cost
            } else {
                (state.average_cost - price) / state.average_cost
            };
            state.position.abs() * pct
        }
        MarketType::Spot => state.position * (price - state.average_cost),
        MarketType::Option => {
            let premium = state.position * (price - state.average_cost);
            if state.info.denominated_in_underlying {
                premium
            } else {
                let underlying = state
                    .option_theo
                    .as_ref()
                    .map_or(price, |t| t.underlying_price);
                if underlying > 0.0 {
                    premium / underlying
                } else {
                    0.0
                }
            }
        }
    }
}

fn leverage_at(state: &MarketState, price: f64) -> f64 {
    match state.info.market_type {
        MarketType::Future => {
            let denom = state.balance * price;
            if denom > 0.0 {
                state.position.abs() / denom
            } else {
                0.0
            }
        }
        MarketType::Spot | MarketType::Option => {
            if state.balance > 0.0 {
                (state.position.abs() * price) / state.balance
            } else {
                0.0
            }
        }
    }
}

/// Build the history row for the current bar.
#[must_use]
pub fn snapshot(state: &MarketState) -> HistoryRow {
    let (best_price, worst_price) = if state.position >= 0.0 {
        (state.bar.high, state.bar.low)
    } else {
        (state.bar.low, state.bar.high)
    };
    HistoryRow {
        timestamp: state.bar.timestamp,
        symbol: state.info.symbol.clone(),
        close: state.bar.close,
        position: state.position,
        average_cost: state.average_cost,
        balance: state.balance,
        leverage: state.leverage,
        unrealized_profit: state.unrealized_profit,
        realized_profit: state.realized_profit,
        profit: state.profit,
        ubalance: state.balance + state.unrealized_profit,
        weight: state.weight,
        max_loss: unrealized_at(state, worst_price) + state.realized_profit,
        max_profit: unrealized_at(state, best_price) + state.realized_profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::Bar;
    use crate::market::MarketInfo;

    #[test]
    fn marking_a_long_future_at_a_gain() {
        let mut state = MarketState::new(MarketInfo::future("XBTUSD"), 1.0);
        state.position = 10.0;
        state.average_cost = 100.0;
        state.bar = Bar::flat(110.0);
        mark(&mut state);
        assert!((state.unrealized_profit - 1.0).abs() < 1e-12);
        assert!((state.leverage - 10.0 / 110.0).abs() < 1e-12);
        let row = snapshot(&state);
        assert!((row.ubalance - 2.0).abs() < 1e-12);
        assert_eq!(row.max_profit, row.max_loss);
    }

    #[test]
    fn marking_a_short_future_at_a_gain() {
        let mut state = MarketState::new(MarketInfo::future("XBTUSD"), 1.0);
        state.position = -10.0;
        state.average_cost = 100.0;
        state.bar = Bar::flat(90.0);
        mark(&mut state);
        assert!((state.unrealized_profit - 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_or_degenerate_state_marks_to_zero() {
        let mut state = MarketState::new(MarketInfo::future("XBTUSD"), 0.0);
        state.bar = Bar::flat(100.0);
        mark(&mut state);
        assert_eq!(state.unrealized_profit, 0.0);
        assert_eq!(state.leverage, 0.0);

        state.position = 5.0;
        state.average_cost = 0.0;
        mark(&mut state);
        assert_eq!(state.unrealized_profit, 0.0);
    }
}
