//! Applies a reconciliation plan against an exchange.

use crate::reconcile::Action;
use anyhow::{Context, Result};
use tracing::info;
use tradeframe_core::events::OrderUpdate;
use tradeframe_core::traits::ExchangeClient;

/// Execute a plan in order, failing fast.
///
/// A transport error aborts immediately with the remaining actions
/// unsent; the next reconciliation pass rebuilds the plan from whatever
/// actually reached the venue, so nothing is retried here.
///
/// # Errors
///
/// Propagates the first cancel or place failure.
pub async fn apply_plan(
    client: &dyn ExchangeClient,
    actions: Vec<Action>,
) -> Result<Vec<OrderUpdate>> {
    let mut placed = Vec::new();
    for action in actions {
        match action {
            Action::Cancel { symbol, order_ids } => {
                info!(symbol = %symbol, count = order_ids.len(), "cancelling orders");
                client
                    .cancel_orders(&symbol, &order_ids)
                    .await
                    .with_context(|| format!("cancel failed for {symbol}"))?;
            }
            Action::Place(order) => {
                info!(
                    symbol = %order.symbol,
                    side = ?order.side,
                    price = order.price,
                    quantity = order.quantity,
                    "placing order"
                );
                let update = client
                    .place_order(order)
                    .await
                    .context("order placement failed")?;
                placed.push(update);
            }
        }
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tradeframe_core::events::{PositionUpdate, WalletEntry, WsChannels};
    use tradeframe_core::orders::{NewOrder, OrderKind, OrderStatus, Side};

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_on_place: bool,
    }

    #[async_trait]
    impl ExchangeClient for Recorder {
        async fn get_balances(&self) -> Result<Vec<WalletEntry>> {
            Ok(Vec::new())
        }

        async fn get_positions(&self) -> Result<Vec<PositionUpdate>> {
            Ok(Vec::new())
        }

        async fn get_open_orders(&self) -> Result<Vec<OrderUpdate>> {
            Ok(Vec::new())
        }

        async fn place_order(&self, order: NewOrder) -> Result<OrderUpdate> {
            if self.fail_on_place {
                bail!("venue rejected order");
            }
            self.log.lock().unwrap().push(format!("place {}", order.price));
            Ok(OrderUpdate {
                order_id: "1".to_string(),
                symbol: order.symbol,
                side: order.side,
                price: order.price,
                quantity: order.quantity,
                status: OrderStatus::New,
            })
        }

        async fn cancel_orders(&self, _symbol: &str, order_ids: &[String]) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("cancel {}", order_ids.join(",")));
            Ok(())
        }

        async fn start_stream(&self) -> Result<WsChannels> {
            bail!("not streamed in tests")
        }
    }

    fn place(price: f64) -> Action {
        Action::Place(NewOrder {
            symbol: "XBTUSD".to_string(),
            side: Side::Buy,
            price,
            quantity: 1.0,
            kind: OrderKind::Limit,
        })
    }

    #[tokio::test]
    async fn plan_executes_in_order() {
        let client = Recorder::default();
        let plan = vec![
            Action::Cancel {
                symbol: "XBTUSD".to_string(),
                order_ids: vec!["a".to_string()],
            },
            place(99.0),
            place(98.0),
        ];
        let placed = apply_plan(&client, plan).await.unwrap();
        assert_eq!(placed.len(), 2);
        let log = client.log.lock().unwrap();
        assert_eq!(*log, vec!["cancel a", "place 99", "place 98"]);
    }

    #[tokio::test]
    async fn first_failure_aborts_the_plan() {
        let client = Recorder {
            fail_on_place: true,
            ..Recorder::default()
        };
        let plan = vec![place(99.0), place(98.0)];
        assert!(apply_plan(&client, plan).await.is_err());
        assert!(client.log.lock().unwrap().is_empty());
    }
}
