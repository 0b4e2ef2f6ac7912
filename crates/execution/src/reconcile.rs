//! Order reconciliation.
//!
//! Diffs the desired leg books against the orders resident on the
//! exchange and emits the minimal cancel/place sequence, ordered so the
//! levels closest to the market are refreshed first.

use tradeframe_core::market::{MarketInfo, MarketState};
use tradeframe_core::orders::{NewOrder, OrderKind, OrderLeg, OrderStatus, Side};

/// One step of the reconciliation plan, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Cancel {
        symbol: String,
        order_ids: Vec<String>,
    },
    Place(NewOrder),
}

/// Match thresholds, as fractions of the desired price and quantity. An
/// open order within both stays untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tolerances {
    pub price: f64,
    pub quantity: f64,
}

/// Collapse a leg book into exchange-sized orders.
///
/// Legs accumulate in book order until the running quantity clears the
/// market minimum, then emit one order at the leg price that crossed the
/// threshold. A trailing remainder below the minimum is dropped.
#[must_use]
pub fn aggregate_legs(legs: &[OrderLeg], info: &MarketInfo) -> Vec<OrderLeg> {
    let mut out = Vec::new();
    let mut pending = 0.0;
    for leg in legs {
        pending += leg.quantity;
        if pending >= info.min_order_size && pending > 0.0 {
            let quantity = quantize(pending, info.quantity_step);
            if quantity > 0.0 {
                out.push(OrderLeg {
                    price: leg.price,
                    quantity,
                });
            }
            pending = 0.0;
        }
    }
    out
}

fn quantize(quantity: f64, step: f64) -> f64 {
    if step > 0.0 {
        (quantity / step).round() * step
    } else {
        quantity
    }
}

/// Build the cancel/place plan for one market.
///
/// `market_price` orders the plan: whichever pending order sits closest
/// to it is refreshed first, cancelling the stale order it replaces
/// immediately beforehand so the book never doubles up near the touch.
/// Stale orders with no replacement are cancelled at the end, in one bulk
/// action when the venue supports it.
#[must_use]
pub fn reconcile(state: &MarketState, market_price: f64, tolerances: Tolerances) -> Vec<Action> {
    let info = &state.info;
    let mut want_bids = aggregate_legs(&state.buy_orders.legs, info);
    let mut want_asks = aggregate_legs(&state.sell_orders.legs, info);
    let mut open_bids: Vec<_> = state
        .open_orders
        .values()
        .filter(|o| o.side == Side::Buy && is_live(o.status))
        .cloned()
        .collect();
    let mut open_asks: Vec<_> = state
        .open_orders
        .values()
        .filter(|o| o.side == Side::Sell && is_live(o.status))
        .cloned()
        .collect();

    sift(&mut want_bids, &mut open_bids, tolerances);
    sift(&mut want_asks, &mut open_asks, tolerances);

    // Closest to the market first. Bids sit below it, asks above.
    want_bids.sort_by(|a, b| b.price.total_cmp(&a.price));
    open_bids.sort_by(|a, b| b.price.total_cmp(&a.price));
    want_asks.sort_by(|a, b| a.price.total_cmp(&b.price));
    open_asks.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut plan = Vec::new();
    let mut bid_idx = 0;
    let mut ask_idx = 0;
    while bid_idx < want_bids.len() || ask_idx < want_asks.len() {
        let bid_distance = want_bids
            .get(bid_idx)
            .map_or(f64::INFINITY, |l| (l.price - market_price).abs());
        let ask_distance = want_asks
            .get(ask_idx)
            .map_or(f64::INFINITY, |l| (l.price - market_price).abs());
        if bid_distance <= ask_distance {
            step_side(
                &mut plan,
                info,
                &want_bids[bid_idx],
                open_bids.get(bid_idx),
                Side::Buy,
            );
            bid_idx += 1;
        } else {
            step_side(
                &mut plan,
                info,
                &want_asks[ask_idx],
                open_asks.get(ask_idx),
                Side::Sell,
            );
            ask_idx += 1;
        }
    }

    let mut stale: Vec<String> = open_bids
        .drain(bid_idx.min(open_bids.len())..)
        .map(|o| o.order_id)
        .collect();
    stale.extend(
        open_asks
            .drain(ask_idx.min(open_asks.len())..)
            .map(|o| o.order_id),
    );
    if !stale.is_empty() {
        if info.bulk_cancel_supported {
            plan.push(Action::Cancel {
                symbol: info.symbol.clone(),
                order_ids: stale,
            });
        } else {
            for id in stale {
                plan.push(Action::Cancel {
                    symbol: info.symbol.clone(),
                    order_ids: vec![id],
                });
            }
        }
    }
    plan
}

fn is_live(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::New | OrderStatus::Open)
}

/// Remove desired/open pairs that already agree within tolerance.
fn sift(
    want: &mut Vec<OrderLeg>,
    open: &mut Vec<tradeframe_core::orders::OpenOrder>,
    tolerances: Tolerances,
) {
    let mut want_idx = 0;
    while want_idx < want.len() {
        let leg = want[want_idx];
        let matched = open.iter().position(|o| {
            (o.price - leg.price).abs() <= tolerances.price * leg.price
                && (o.quantity - leg.quantity).abs() <= tolerances.quantity * leg.quantity
        });
        if let Some(open_idx) = matched {
            open.remove(open_idx);
            want.remove(want_idx);
        } else {
            want_idx += 1;
        }
    }
}

fn step_side(
    plan: &mut Vec<Action>,
    info: &MarketInfo,
    leg: &OrderLeg,
    stale: Option<&tradeframe_core::orders::OpenOrder>,
    side: Side,
) {
    if let Some(stale) = stale {
        plan.push(Action::Cancel {
            symbol: info.symbol.clone(),
            order_ids: vec![stale.order_id.clone()],
        });
    }
    // A zero price means "take the market", used by option legs whose
    // venue has no resting book.
    let kind = if leg.price == 0.0 {
        OrderKind::Market
    } else {
        OrderKind::Limit
    };
    plan.push(Action::Place(NewOrder {
        symbol: info.symbol.clone(),
        side,
        price: leg.price,
        quantity: leg.quantity,
        kind,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeframe_core::market::MarketInfo;
    use tradeframe_core::market::MarketState;
    use tradeframe_core::orders::OpenOrder;

    fn state() -> MarketState {
        let mut info = MarketInfo::future("XBTUSD");
        info.min_order_size = 1.0;
        info.quantity_step = 0.1;
        MarketState::new(info, 1.0)
    }

    fn open(state: &mut MarketState, id: &str, side: Side, price: f64, quantity: f64) {
        state.open_orders.insert(
            id.to_string(),
            OpenOrder {
                order_id: id.to_string(),
                symbol: "XBTUSD".to_string(),
                side,
                price,
                quantity,
                status: OrderStatus::Open,
            },
        );
    }

    #[test]
    fn empty_books_and_no_opens_is_a_no_op() {
        let s = state();
        assert!(reconcile(&s, 100.0, Tolerances::default()).is_empty());
    }

    #[test]
    fn desired_orders_become_places() {
        let mut s = state();
        s.buy_orders.push(99.0, 10.0);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        assert_eq!(
            plan,
            vec![Action::Place(NewOrder {
                symbol: "XBTUSD".to_string(),
                side: Side::Buy,
                price: 99.0,
                quantity: 10.0,
                kind: OrderKind::Limit,
            })]
        );
    }

    #[test]
    fn matching_open_order_is_left_alone() {
        let mut s = state();
        s.buy_orders.push(99.0, 10.0);
        open(&mut s, "a", Side::Buy, 99.0, 10.0);
        assert!(reconcile(&s, 100.0, Tolerances::default()).is_empty());
    }

    #[test]
    fn near_miss_within_tolerance_is_kept() {
        let mut s = state();
        s.buy_orders.push(99.0, 10.0);
        open(&mut s, "a", Side::Buy, 99.5, 10.0);
        let loose = Tolerances {
            price: 0.01,
            quantity: 0.0,
        };
        assert!(reconcile(&s, 100.0, loose).is_empty());
        assert_eq!(reconcile(&s, 100.0, Tolerances::default()).len(), 2);
    }

    #[test]
    fn stale_order_is_cancelled_before_its_replacement() {
        let mut s = state();
        s.buy_orders.push(99.0, 10.0);
        open(&mut s, "a", Side::Buy, 95.0, 10.0);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0],
            Action::Cancel {
                symbol: "XBTUSD".to_string(),
                order_ids: vec!["a".to_string()],
            }
        );
        assert!(matches!(plan[1], Action::Place(_)));
    }

    #[test]
    fn plan_walks_outward_from_the_market_price() {
        let mut s = state();
        s.buy_orders.push(99.0, 1.0);
        s.buy_orders.push(97.0, 1.0);
        s.sell_orders.push(102.0, 1.0);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        let prices: Vec<f64> = plan
            .iter()
            .map(|a| match a {
                Action::Place(o) => o.price,
                Action::Cancel { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(prices, vec![99.0, 102.0, 97.0]);
    }

    #[test]
    fn orphaned_opens_are_bulk_cancelled_when_supported() {
        let mut s = state();
        s.info.bulk_cancel_supported = true;
        open(&mut s, "a", Side::Buy, 95.0, 1.0);
        open(&mut s, "b", Side::Sell, 105.0, 1.0);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        assert_eq!(plan.len(), 1);
        match &plan[0] {
            Action::Cancel { order_ids, .. } => assert_eq!(order_ids.len(), 2),
            Action::Place(_) => panic!("expected a cancel"),
        }
    }

    #[test]
    fn orphaned_opens_cancel_individually_otherwise() {
        let mut s = state();
        open(&mut s, "a", Side::Buy, 95.0, 1.0);
        open(&mut s, "b", Side::Sell, 105.0, 1.0);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        assert_eq!(plan.len(), 2);
        assert!(plan
            .iter()
            .all(|a| matches!(a, Action::Cancel { order_ids, .. } if order_ids.len() == 1)));
    }

    #[test]
    fn sub_minimum_legs_accumulate_then_drop_the_remainder() {
        let mut s = state();
        s.buy_orders.push(99.0, 0.4);
        s.buy_orders.push(98.0, 0.7);
        s.buy_orders.push(97.0, 0.4);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        // 0.4 + 0.7 clears the 1.0 minimum at the second leg; the
        // trailing 0.4 never does and is dropped.
        assert_eq!(
            plan,
            vec![Action::Place(NewOrder {
                symbol: "XBTUSD".to_string(),
                side: Side::Buy,
                price: 98.0,
                quantity: 1.1,
                kind: OrderKind::Limit,
            })]
        );
    }

    #[test]
    fn zero_priced_leg_places_a_market_order() {
        let mut s = state();
        s.info.min_order_size = 0.0;
        s.sell_orders.push(0.0, 2.0);
        let plan = reconcile(&s, 100.0, Tolerances::default());
        match &plan[0] {
            Action::Place(o) => assert_eq!(o.kind, OrderKind::Market),
            Action::Cancel { .. } => panic!("expected a place"),
        }
    }
}
