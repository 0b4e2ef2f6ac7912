//! Fill simulation against a single bar.

use tradeframe_core::market::MarketState;
use tradeframe_core::orders::{Fill, LegBook};
use tradeframe_core::Bar;
use tradeframe_core::FillType;

/// Simulated fills for one market over one bar. Each side collapses to at
/// most one blended fill; `None` means nothing traded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulatedFills {
    /// Buy fill, quantity positive.
    pub bid: Option<Fill>,
    /// Sell fill, quantity negative.
    pub ask: Option<Fill>,
}

/// Simulate the desired leg books against `bar`.
///
/// Under [`FillType::Limit`] a bid trades only when the bar trades through
/// it (`price > bar.low`) and an ask only when `price < bar.high`. The
/// other fill types assume every leg trades and differ only in the price
/// assigned. Multiple legs on a side blend into one volume-weighted fill.
#[must_use]
pub fn simulate(state: &MarketState, bar: &Bar, fill_type: FillType) -> SimulatedFills {
    let bid = side_fill(&state.buy_orders, bar, fill_type, true);
    let ask = side_fill(&state.sell_orders, bar, fill_type, false);
    SimulatedFills {
        bid,
        ask: ask.map(|f| Fill {
            price: f.price,
            quantity: -f.quantity,
        }),
    }
}

fn side_fill(book: &LegBook, bar: &Bar, fill_type: FillType, is_bid: bool) -> Option<Fill> {
    let mut notional = 0.0;
    let mut quantity = 0.0;
    for leg in &book.legs {
        if leg.quantity == 0.0 {
            continue;
        }
        let price = match fill_type {
            FillType::Limit => {
                let crossed = if is_bid {
                    leg.price > bar.low
                } else {
                    leg.price < bar.high
                };
                if !crossed {
                    continue;
                }
                leg.price
            }
            FillType::Close => bar.close,
            FillType::Open => bar.open,
            FillType::MeanOc => (bar.open + bar.close) / 2.0,
            FillType::MeanHl => (bar.high + bar.low) / 2.0,
            FillType::Worst => {
                if is_bid {
                    bar.high
                } else {
                    bar.low
                }
            }
        };
        notional += price * leg.quantity;
        quantity += leg.quantity;
    }
    if quantity == 0.0 {
        None
    } else {
        Some(Fill {
            price: notional / quantity,
            quantity,
        })
    }
}
