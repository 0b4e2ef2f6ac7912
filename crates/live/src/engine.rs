//! Live trading loop.
//!
//! Multiplexes the four exchange stream channels into the same ledger,
//! sizing, and reconciliation pipeline the backtester runs, and
//! periodically replays its own candle history through the backtester to
//! catch any divergence between simulated and real accounting.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use tradeframe_backtest::BacktestReport;
use tradeframe_core::events::{OrderUpdate, PositionUpdate, TradeBin, WalletEntry};
use tradeframe_core::history::mark;
use tradeframe_core::market::MarketType;
use tradeframe_core::orders::{OpenOrder, OrderStatus};
use tradeframe_core::sizing::setup_orders;
use tradeframe_core::traits::{BarStore, ExchangeClient, Strategy};
use tradeframe_core::{Account, Bar, EngineConfig};
use tradeframe_execution::{apply_plan, reconcile, Tolerances};

/// Relative mismatch between live and replayed state worth flagging.
const PARITY_EPSILON: f64 = 1e-6;

pub struct LiveEngine<C: ExchangeClient> {
    client: C,
    config: EngineConfig,
    account: Account,
    /// Symbols whose first authoritative position snapshot has arrived.
    seeded: BTreeSet<String>,
    bars_seen: usize,
}

impl<C: ExchangeClient> LiveEngine<C> {
    #[must_use]
    pub fn new(client: C, config: EngineConfig) -> Self {
        let account = config.build_account();
        Self {
            client,
            config,
            account,
            seeded: BTreeSet::new(),
            bars_seen: 0,
        }
    }

    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Preload candle history so strategies have context from the first
    /// live bar.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn warmup(&mut self, store: &dyn BarStore) -> Result<()> {
        let symbols: Vec<String> = self.account.markets.keys().cloned().collect();
        for symbol in symbols {
            let bars = store
                .bars(&symbol, self.config.data_length + 1)
                .await
                .with_context(|| format!("failed to warm up candles for {symbol}"))?;
            let state = self.account.market_mut(&symbol).context("missing market")?;
            if let Some(last) = bars.last() {
                state.bar = *last;
                state.last_price = last.close;
            }
            state.candles = bars;
            info!(symbol = %symbol, candles = state.candles.len(), "warmed up");
        }
        Ok(())
    }

    /// Synchronize with the exchange, then trade until the candle stream
    /// closes. Stream disconnection is the normal way a session ends;
    /// any transport or booking failure aborts with an error instead of
    /// trading on doubtful state.
    ///
    /// # Errors
    ///
    /// Fails on initial sync errors, order placement errors, or a fill
    /// that cannot be booked.
    pub async fn run(&mut self, strategy: &mut dyn Strategy) -> Result<()> {
        let balances = self.client.get_balances().await.context("balance sync failed")?;
        self.on_wallets(balances);
        let positions = self.client.get_positions().await.context("position sync failed")?;
        self.on_positions(positions);
        let orders = self.client.get_open_orders().await.context("order sync failed")?;
        self.on_orders(orders);
        // Deposits and withdrawals since the last session are informational;
        // a venue without the endpoint must not block startup.
        match self.client.get_wallet_history().await {
            Ok(history) => debug!(entries = history.len(), "wallet history synced"),
            Err(err) => warn!(error = %err, "wallet history sync failed"),
        }

        let mut channels = self.client.start_stream().await.context("stream start failed")?;
        info!(strategy = strategy.name(), "live session started");

        loop {
            tokio::select! {
                Some(updates) = channels.positions.recv() => self.on_positions(updates),
                Some(entries) = channels.wallets.recv() => self.on_wallets(entries),
                Some(updates) = channels.orders.recv() => self.on_orders(updates),
                bins = channels.trade_bins.recv() => match bins {
                    Some(bins) => self.on_trade_bins(bins, strategy).await?,
                    None => break,
                },
            }
        }
        info!("candle stream closed, ending live session");
        Ok(())
    }

    fn on_positions(&mut self, updates: Vec<PositionUpdate>) {
        for update in updates {
            let first = self.seeded.insert(update.symbol.clone());
            let Some(state) = self.account.market_mut(&update.symbol) else {
                debug!(symbol = %update.symbol, "position update for untracked symbol");
                continue;
            };
            state.position = update.quantity;
            state.average_cost = update.average_cost;
            if state.position == 0.0 {
                state.average_cost = 0.0;
                state.leverage = 0.0;
            } else {
                mark(state);
            }
            // The first snapshot defines what we already hold, so the
            // sizing accumulator starts from it instead of from zero.
            if first {
                state.should_have_quantity = state.position;
            }
        }
    }

    fn on_wallets(&mut self, entries: Vec<WalletEntry>) {
        for entry in entries {
            if entry.asset == self.account.base_asset.symbol {
                self.account.base_asset.quantity = entry.quantity;
                for state in self.account.markets.values_mut() {
                    if state.info.market_type != MarketType::Spot {
                        state.balance = entry.quantity;
                    }
                }
                continue;
            }
            // Other assets are spot holdings: the wallet is the
            // authoritative position for the market that trades them.
            for state in self.account.markets.values_mut() {
                if state.info.market_type == MarketType::Spot
                    && state.info.spot_asset.as_deref() == Some(entry.asset.as_str())
                {
                    state.position = entry.quantity;
                    if state.position == 0.0 {
                        state.average_cost = 0.0;
                    }
                }
            }
        }
    }

    fn on_orders(&mut self, updates: Vec<OrderUpdate>) {
        for update in updates {
            let Some(state) = self.account.market_mut(&update.symbol) else {
                continue;
            };
            match update.status {
                OrderStatus::New | OrderStatus::Open => {
                    state.open_orders.insert(
                        update.order_id.clone(),
                        OpenOrder {
                            order_id: update.order_id,
                            symbol: update.symbol,
                            side: update.side,
                            price: update.price,
                            quantity: update.quantity,
                            status: update.status,
                        },
                    );
                }
                OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected => {
                    state.open_orders.remove(&update.order_id);
                }
            }
        }
    }

    async fn on_trade_bins(
        &mut self,
        bins: Vec<TradeBin>,
        strategy: &mut dyn Strategy,
    ) -> Result<()> {
        let mut fresh_bar = false;
        for bin in bins {
            let symbol = bin.symbol.clone();
            {
                let Some(state) = self.account.market_mut(&symbol) else {
                    continue;
                };
                state.bar = bin.bar;
                state.last_price = bin.bar.close;
                // A bin for a timestamp already cached is a revision of
                // that candle, not a new one.
                match state.candles.last_mut() {
                    Some(last) if last.timestamp == bin.bar.timestamp => *last = bin.bar,
                    _ => {
                        fresh_bar = true;
                        state.candles.push(bin.bar);
                    }
                }
            }

            strategy.on_bar(&mut self.account, &symbol);

            let reference = bin.bar.close;
            let tolerances = self
                .config
                .market_config(&symbol)
                .map_or_else(Tolerances::default, |m| Tolerances {
                    price: m.price_tolerance,
                    quantity: m.quantity_tolerance,
                });
            let plan = {
                let state = self.account.market_mut(&symbol).context("missing market")?;
                setup_orders(state, reference);
                mark(state);
                if state.auto_order_placement {
                    reconcile(state, reference, tolerances)
                } else {
                    Vec::new()
                }
            };
            if !plan.is_empty() {
                apply_plan(&self.client, plan).await?;
            }
        }
        self.account.aggregate_profit();

        if fresh_bar {
            self.bars_seen += 1;
            if self.config.live_test_interval > 0
                && self.bars_seen % self.config.live_test_interval == 0
            {
                // Diagnostics only. A failed replay must never take the
                // live session down with it.
                if let Err(err) = self.parity_check(strategy) {
                    warn!(error = %err, "parity replay failed");
                }
            }
        }
        Ok(())
    }

    /// Replay this session's candles through the backtester from a clean
    /// account and compare where it lands against the live state.
    fn parity_check(&mut self, strategy: &mut dyn Strategy) -> Result<()> {
        let report = self.replay(strategy)?;
        debug!(score = report.score, "parity replay complete");
        Ok(())
    }

    fn replay(&mut self, strategy: &mut dyn Strategy) -> Result<BacktestReport> {
        let mut shadow = self.account.deep_clone();
        let mut data: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        for (symbol, state) in &mut shadow.markets {
            data.insert(symbol.clone(), std::mem::take(&mut state.candles));
            state.position = 0.0;
            state.average_cost = 0.0;
            state.balance = self.config.base_quantity;
            state.leverage = 0.0;
            state.weight = 0;
            state.should_have_quantity = 0.0;
            state.unrealized_profit = 0.0;
            state.realized_profit = 0.0;
            state.profit = 0.0;
            state.buy_orders.clear();
            state.sell_orders.clear();
            state.open_orders.clear();
        }
        let report = tradeframe_backtest::run(&mut shadow, strategy, &data, &self.config)?;

        for (symbol, replayed) in &shadow.markets {
            let live = self.account.market(symbol).context("missing market")?;
            if !within(replayed.position, live.position) {
                warn!(
                    symbol = %symbol,
                    live = live.position,
                    replayed = replayed.position,
                    "position diverges from replay"
                );
            }
            if !within(replayed.balance, live.balance) {
                warn!(
                    symbol = %symbol,
                    live = live.balance,
                    replayed = replayed.balance,
                    "balance diverges from replay"
                );
            }
        }
        Ok(report)
    }
}

fn within(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= PARITY_EPSILON * scale
}
