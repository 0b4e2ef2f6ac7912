//! Order sizing policy.
//!
//! Translates a strategy's target weight and leverage into at most one bid
//! and one ask per cycle, sized as fractions of deployable capital. The
//! policy is pure state-in, orders-out: the reconciler decides what to
//! actually send to the exchange.

use crate::market::MarketState;

/// Which branch of the sizing decision produced the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingRule {
    Entry,
    Exit,
    Deleverage,
    Flatten,
    TopUp,
    None,
}

/// Maximum quote notional deployable at `price` given the leverage limit.
#[must_use]
pub fn can_buy(state: &MarketState, price: f64) -> f64 {
    let limit = if state.info.size_from_max_leverage {
        state.info.max_leverage
    } else {
        state.leverage_target
    };
    state.balance * price * limit
}

/// Decide the fractional order size and direction for the current cycle.
///
/// Returns `(size, side, rule)` where `size` is a fraction of deployable
/// capital and `side` is -1, 0, or 1.
#[must_use]
pub fn order_size(state: &MarketState, price: f64) -> (f64, f64, SizingRule) {
    let weight = f64::from(state.weight);
    let current = state.current_weight();
    let adding = current == weight;
    let can_buy = can_buy(state, price);

    if (state.position == 0.0 || adding)
        && state.leverage + state.deleverage_order_size <= state.leverage_target
        && weight != 0.0
    {
        let headroom = state.leverage_target - state.leverage;
        let size = if state.entry_order_size > headroom {
            headroom
        } else {
            state.entry_order_size
        };
        return (size, weight, SizingRule::Entry);
    }

    if !adding {
        let size = if state.exit_order_size > state.leverage && weight == 0.0 {
            state.leverage
        } else {
            state.exit_order_size
        };
        return (size, -current, SizingRule::Exit);
    }

    if state.position.abs() > can_buy * (1.0 + state.deleverage_order_size) && adding {
        return (state.deleverage_order_size, -current, SizingRule::Deleverage);
    }

    if weight == 0.0 && state.leverage > 0.0 {
        let size = if state.exit_order_size > state.leverage {
            state.leverage
        } else {
            state.exit_order_size
        };
        return (size, -state.position.signum(), SizingRule::Flatten);
    }

    if can_buy > state.position.abs() {
        let size = (can_buy - state.position.abs()) / can_buy;
        return (size, weight, SizingRule::TopUp);
    }

    (0.0, 0.0, SizingRule::None)
}

/// Rebuild the desired leg books for one market at the given reference
/// price. Accumulates the intended position into `should_have_quantity`
/// and emits at most one bid or one ask one tick off the reference.
pub fn setup_orders(state: &mut MarketState, price: f64) {
    state.buy_orders.clear();
    state.sell_orders.clear();
    if !state.auto_order_placement {
        return;
    }

    let (size, side, rule) = order_size(state, price);
    let weight = f64::from(state.weight);
    let can_buy = can_buy(state, price);

    if side != 0.0 {
        state.should_have_quantity += size * side * (state.balance * price);
    }

    if weight == 0.0 {
        // Flattening never overshoots through zero.
        if state.position > 0.0 {
            state.should_have_quantity = state.should_have_quantity.clamp(0.0, state.position);
        } else if state.position < 0.0 {
            state.should_have_quantity = state.should_have_quantity.clamp(state.position, 0.0);
        } else {
            state.should_have_quantity = 0.0;
        }
    } else if rule == SizingRule::Deleverage {
        // Deleveraging stops at the capital limit, never below it.
        if state.current_weight() > 0.0 {
            state.should_have_quantity = state.should_have_quantity.max(can_buy);
        } else {
            state.should_have_quantity = state.should_have_quantity.min(-can_buy);
        }
    } else if weight > 0.0 {
        state.should_have_quantity = state.should_have_quantity.min(can_buy);
    } else {
        state.should_have_quantity = state.should_have_quantity.max(-can_buy);
    }

    let quantity = state.should_have_quantity - state.position;
    if quantity > 0.0 {
        state
            .buy_orders
            .push(price - state.info.tick_size, quantity);
    } else if quantity < 0.0 {
        state
            .sell_orders
            .push(price + state.info.tick_size, -quantity);
    }
}
