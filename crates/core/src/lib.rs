//! Core types and accounting for the tradeframe trading engine: the
//! account model, the position ledger, the order sizing policy, and the
//! traits the backtest and live loops are built against.

pub mod bar;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod ledger;
pub mod market;
pub mod orders;
pub mod params;
pub mod sizing;
pub mod traits;

pub use bar::Bar;
pub use config::{EngineConfig, FillType, MarketConfig};
pub use error::{ConfigError, LedgerError};
pub use events::{
    stream_channels, OrderUpdate, PositionUpdate, TradeBin, WalletEntry, WsChannels, WsSenders,
};
pub use history::{mark, snapshot, HistoryRow};
pub use ledger::apply_fill;
pub use market::{Account, BaseAsset, MarketInfo, MarketState, MarketType, OptionTheo, OptionType};
pub use orders::{Fill, LegBook, NewOrder, OpenOrder, OrderKind, OrderLeg, OrderStatus, Side};
pub use params::{ParamStore, ParamValue};
pub use sizing::{order_size, setup_orders, SizingRule};
pub use traits::{BarStore, ExchangeClient, OptionsPricer, Strategy};
