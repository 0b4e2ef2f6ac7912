use crate::bar::Bar;
use crate::events::{OrderUpdate, PositionUpdate, WalletEntry, WsChannels};
use crate::market::{Account, OptionTheo};
use crate::orders::NewOrder;
use anyhow::Result;
use async_trait::async_trait;

/// A trading strategy. Called once per symbol per completed bar, after the
/// candle history has been updated; it steers the account by mutating the
/// symbol's weight and leverage targets.
///
/// The trait is synchronous so the exact same strategy code runs in
/// backtests and inside the live loop's shadow replay.
pub trait Strategy: Send {
    fn on_bar(&mut self, account: &mut Account, symbol: &str);
    fn name(&self) -> &str;
}

/// Transport to a real exchange. Errors from any method are treated as
/// fatal by the live engine; it never retries on partial knowledge.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn get_balances(&self) -> Result<Vec<WalletEntry>>;
    async fn get_positions(&self) -> Result<Vec<PositionUpdate>>;
    async fn get_open_orders(&self) -> Result<Vec<OrderUpdate>>;
    /// Past wallet movements, oldest first. Venues without the endpoint
    /// may return an empty list.
    async fn get_wallet_history(&self) -> Result<Vec<WalletEntry>> {
        Ok(Vec::new())
    }
    async fn place_order(&self, order: NewOrder) -> Result<OrderUpdate>;
    async fn cancel_orders(&self, symbol: &str, order_ids: &[String]) -> Result<()>;
    /// Open the streaming subscription the live engine multiplexes over.
    async fn start_stream(&self) -> Result<WsChannels>;
}

/// Historical candle source used to warm up strategies before go-live.
#[async_trait]
pub trait BarStore: Send + Sync {
    async fn bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>>;
}

/// Option valuation collaborator. Passing a negative volatility asks the
/// pricer to back-solve implied volatility from the cached theo price.
pub trait OptionsPricer: Send + Sync {
    fn evaluate(&self, theo: &mut OptionTheo, volatility: f64);
}
