//! Events flowing from an exchange stream into the live engine.

use crate::bar::Bar;
use crate::orders::{OrderStatus, Side};
use tokio::sync::mpsc;

/// Authoritative position snapshot for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub symbol: String,
    pub quantity: f64,
    pub average_cost: f64,
}

/// Wallet balance entry for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletEntry {
    pub asset: String,
    pub quantity: f64,
}

/// A completed candle for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeBin {
    pub symbol: String,
    pub bar: Bar,
}

/// Lifecycle update for an order resident on the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub status: OrderStatus,
}

/// The four receive channels a live stream subscription produces. The
/// engine multiplexes over them; the run ends when the trade-bin channel
/// closes.
#[derive(Debug)]
pub struct WsChannels {
    pub positions: mpsc::Receiver<Vec<PositionUpdate>>,
    pub trade_bins: mpsc::Receiver<Vec<TradeBin>>,
    pub wallets: mpsc::Receiver<Vec<WalletEntry>>,
    pub orders: mpsc::Receiver<Vec<OrderUpdate>>,
}

/// Sender halves, held by the transport feeding the engine.
#[derive(Debug, Clone)]
pub struct WsSenders {
    pub positions: mpsc::Sender<Vec<PositionUpdate>>,
    pub trade_bins: mpsc::Sender<Vec<TradeBin>>,
    pub wallets: mpsc::Sender<Vec<WalletEntry>>,
    pub orders: mpsc::Sender<Vec<OrderUpdate>>,
}

/// Small buffers keep the engine applying fresh state instead of draining
/// a backlog of stale snapshots.
pub const STREAM_BUFFER: usize = 2;

#[must_use]
pub fn stream_channels() -> (WsSenders, WsChannels) {
    let (positions_tx, positions_rx) = mpsc::channel(STREAM_BUFFER);
    let (trade_bins_tx, trade_bins_rx) = mpsc::channel(STREAM_BUFFER);
    let (wallets_tx, wallets_rx) = mpsc::channel(STREAM_BUFFER);
    let (orders_tx, orders_rx) = mpsc::channel(STREAM_BUFFER);
    (
        WsSenders {
            positions: positions_tx,
            trade_bins: trade_bins_tx,
            wallets: wallets_tx,
            orders: orders_tx,
        },
        WsChannels {
            positions: positions_rx,
            trade_bins: trade_bins_rx,
            wallets: wallets_rx,
            orders: orders_rx,
        },
    )
}
