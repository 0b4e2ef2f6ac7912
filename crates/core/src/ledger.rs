//! Position ledger: books fills into a market state.
//!
//! Every fill flows through [`apply_fill`], both in backtests and live.
//! Keeping a single booking path is what makes the shadow replay
//! comparable to the real account bit for bit.

use crate::error::LedgerError;
use crate::market::{MarketState, MarketType};

/// Book one fill against a market state.
///
/// A signed `quantity` (positive buy, negative sell) moves the position,
/// re-averages the cost basis while adding, and realizes profit into the
/// wallet balance while reducing. A zero quantity is a no-op.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidFillPrice`] when `price` is not strictly
/// positive; booking such a fill would corrupt the cost basis.
pub fn apply_fill(state: &mut MarketState, price: f64, quantity: f64) -> Result<(), LedgerError> {
    if quantity == 0.0 {
        return Ok(());
    }
    if price <= 0.0 {
        return Err(LedgerError::InvalidFillPrice {
            symbol: state.info.symbol.clone(),
            price,
        });
    }

    match state.info.market_type {
        MarketType::Future => apply_future_fill(state, price, quantity),
        MarketType::Option => apply_option_fill(state, price, quantity),
        MarketType::Spot => apply_spot_fill(state, price, quantity),
    }

    if state.position == 0.0 {
        state.average_cost = 0.0;
    }
    state.last_price = price;
    Ok(())
}

fn apply_future_fill(state: &mut MarketState, price: f64, quantity: f64) {
    let position = state.position;
    let adding = position == 0.0 || position.signum() == quantity.signum();

    if adding {
        let total = (position + quantity).abs();
        state.average_cost =
            ((quantity * price).abs() + (position * state.average_cost).abs()) / total;
    } else {
        // Percent move from entry, signed for the direction being closed.
        let pct = if position > 0.0 {
            (price - state.average_cost) / state.average_cost
        } else {
            (state.average_cost - price) / state.average_cost
        };
        if quantity.abs() >= position.abs() {
            let realized = position.abs() * pct;
            state.balance += realized;
            state.realized_profit += realized;
            // Whatever survives the flip was opened at the fill price.
            state.average_cost = price;
        } else {
            let realized = quantity.abs() * pct;
            state.balance += realized;
            state.realized_profit += realized;
        }
    }
    state.position += quantity;
}

fn apply_option_fill(state: &mut MarketState, price: f64, quantity: f64) {
    let position = state.position;
    let adding = position == 0.0 || position.signum() == quantity.signum();

    if adding {
        let total = (position + quantity).abs();
        state.average_cost =
            ((quantity * price).abs() + (position * state.average_cost).abs()) / total;
    } else {
        // Premium PnL for the contracts being closed.
        let pnl = if quantity.abs() >= position.abs() {
            position * (price - state.average_cost)
        } else {
            -quantity * (price - state.average_cost)
        };
        let realized = if state.info.denominated_in_underlying {
            pnl
        } else {
            pnl / underlying_price(state, price)
        };
        state.balance += realized;
        state.realized_profit += realized;
        if quantity.abs() >= position.abs() {
            state.average_cost = price;
        }
    }
    state.position += quantity;
}

/// Spot fills arrive sized in quote notional; the position is held in base
/// units and the wallet pays or receives the notional directly. Reductions
/// book the move against cost basis into `realized_profit` for reporting,
/// but the wallet only ever moves by the notional.
fn apply_spot_fill(state: &mut MarketState, price: f64, quantity: f64) {
    let base_quantity = quantity / price;
    let position = state.position;
    let adding = position == 0.0 || position.signum() == base_quantity.signum();

    if adding {
        let total = (position + base_quantity).abs();
        state.average_cost =
            ((base_quantity * price).abs() + (position * state.average_cost).abs()) / total;
    } else {
        let closed = base_quantity.abs().min(position.abs());
        state.realized_profit += closed * (price - state.average_cost) * position.signum();
        if base_quantity.abs() >= position.abs() {
            state.average_cost = price;
        }
    }
    state.position += base_quantity;
    state.balance -= quantity;
}

fn underlying_price(state: &MarketState, fallback: f64) -> f64 {
    match &state.option_theo {
        Some(theo) if theo.underlying_price > 0.0 => theo.underlying_price,
        _ => {
            if state.bar.close > 0.0 {
                state.bar.close
            } else {
                fallback
            }
        }
    }
}
