use crate::bar::Bar;
use crate::orders::{LegBook, OpenOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Future,
    Spot,
    Option,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

/// Static description of a tradable market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub symbol: String,
    pub market_type: MarketType,
    pub tick_size: f64,
    pub quantity_step: f64,
    pub min_order_size: f64,
    pub max_leverage: f64,
    pub bulk_cancel_supported: bool,
    /// Option PnL settles in the underlying asset instead of quote.
    pub denominated_in_underlying: bool,
    /// Size off the exchange maximum leverage instead of the target.
    pub size_from_max_leverage: bool,
    /// Wallet asset a spot position is held in; live wallet updates for
    /// that asset refresh the position directly.
    pub spot_asset: Option<String>,
}

impl MarketInfo {
    #[must_use]
    pub fn future(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            market_type: MarketType::Future,
            tick_size: 0.5,
            quantity_step: 1.0,
            min_order_size: 0.0,
            max_leverage: 1.0,
            bulk_cancel_supported: false,
            denominated_in_underlying: false,
            size_from_max_leverage: false,
            spot_asset: None,
        }
    }
}

/// Theoretical value and greeks for an option contract, produced by the
/// pricing collaborator and cached on the market state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionTheo {
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub option_type: OptionType,
    pub underlying_price: f64,
    pub theo: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub implied_vol: f64,
}

/// Per-symbol trading state: position, cost basis, balance, leverage,
/// strategy targets, and the local order books.
///
/// Created once per symbol at account setup and mutated every cycle by the
/// ledger and the sizing policy; never destroyed during a run.
#[derive(Debug, Clone)]
pub struct MarketState {
    pub info: MarketInfo,
    pub position: f64,
    pub average_cost: f64,
    pub balance: f64,
    pub unrealized_profit: f64,
    pub realized_profit: f64,
    pub profit: f64,
    pub leverage: f64,
    /// Target direction: -1 short, 0 flat, 1 long.
    pub weight: i32,
    pub leverage_target: f64,
    pub entry_order_size: f64,
    pub exit_order_size: f64,
    pub deleverage_order_size: f64,
    /// Running accumulator of intended position size, in quote notional.
    pub should_have_quantity: f64,
    pub auto_order_placement: bool,
    pub bar: Bar,
    pub last_price: f64,
    pub candles: Vec<Bar>,
    pub buy_orders: LegBook,
    pub sell_orders: LegBook,
    pub open_orders: BTreeMap<String, OpenOrder>,
    pub option_theo: Option<OptionTheo>,
}

impl MarketState {
    #[must_use]
    pub fn new(info: MarketInfo, balance: f64) -> Self {
        Self {
            info,
            position: 0.0,
            average_cost: 0.0,
            balance,
            unrealized_profit: 0.0,
            realized_profit: 0.0,
            profit: 0.0,
            leverage: 0.0,
            weight: 0,
            leverage_target: 1.0,
            entry_order_size: 1.0,
            exit_order_size: 1.0,
            deleverage_order_size: 0.0,
            should_have_quantity: 0.0,
            auto_order_placement: false,
            bar: Bar::default(),
            last_price: 0.0,
            candles: Vec::new(),
            buy_orders: LegBook::new(),
            sell_orders: LegBook::new(),
            open_orders: BTreeMap::new(),
            option_theo: None,
        }
    }

    /// Sign of the current position, or the target weight when flat.
    #[must_use]
    pub fn current_weight(&self) -> f64 {
        if self.position == 0.0 {
            f64::from(self.weight)
        } else {
            self.position.signum()
        }
    }

    /// Explicit deep copy for the shadow-parity backtest. Every owned
    /// buffer (candles, leg books, open-order map) is duplicated so the
    /// replay cannot alias live state.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            candles: self.candles.clone(),
            buy_orders: LegBook {
                legs: self.buy_orders.legs.clone(),
            },
            sell_orders: LegBook {
                legs: self.sell_orders.legs.clone(),
            },
            open_orders: self.open_orders.clone(),
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseAsset {
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
}

/// All state for one trading account. Each `MarketState` is owned by
/// exactly one account; symbols iterate in deterministic (sorted) order.
#[derive(Debug, Clone)]
pub struct Account {
    pub base_asset: BaseAsset,
    pub markets: BTreeMap<String, MarketState>,
    pub unrealized_profit: f64,
    pub realized_profit: f64,
    pub profit: f64,
}

impl Account {
    #[must_use]
    pub fn new(base_symbol: &str, base_quantity: f64) -> Self {
        Self {
            base_asset: BaseAsset {
                symbol: base_symbol.to_string(),
                quantity: base_quantity,
                price: 0.0,
            },
            markets: BTreeMap::new(),
            unrealized_profit: 0.0,
            realized_profit: 0.0,
            profit: 0.0,
        }
    }

    pub fn add_market(&mut self, info: MarketInfo) {
        let state = MarketState::new(info.clone(), self.base_asset.quantity);
        self.markets.insert(info.symbol, state);
    }

    #[must_use]
    pub fn market(&self, symbol: &str) -> Option<&MarketState> {
        self.markets.get(symbol)
    }

    pub fn market_mut(&mut self, symbol: &str) -> Option<&mut MarketState> {
        self.markets.get_mut(symbol)
    }

    /// Sum unrealized and realized profit across all market states.
    pub fn aggregate_profit(&mut self) {
        let mut unrealized = 0.0;
        let mut realized = 0.0;
        for state in self.markets.values() {
            unrealized += state.unrealized_profit;
            realized += state.realized_profit;
        }
        self.unrealized_profit = unrealized;
        self.realized_profit = realized;
        self.profit = unrealized + realized;
    }

    /// Explicit deep copy for the shadow-parity backtest.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            base_asset: self.base_asset.clone(),
            markets: self
                .markets
                .iter()
                .map(|(symbol, state)| (symbol.clone(), state.deep_clone()))
                .collect(),
            unrealized_profit: self.unrealized_profit,
            realized_profit: self.realized_profit,
            profit: self.profit,
        }
    }
}
