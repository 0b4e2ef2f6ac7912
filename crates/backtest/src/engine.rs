//! Bar-replay backtest loop.

use crate::data;
use crate::fills::simulate;
use crate::metrics::{score, MinMaxStats};
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use tradeframe_core::history::{mark, snapshot};
use tradeframe_core::ledger::apply_fill;
use tradeframe_core::sizing::setup_orders;
use tradeframe_core::traits::Strategy;
use tradeframe_core::{Account, Bar, EngineConfig, HistoryRow};

/// Outcome of one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    /// Annualized risk-adjusted score; -100.0 when the run was degenerate.
    pub score: f64,
    /// Sum of wallet balances across markets at the end of the run.
    pub final_balance: f64,
    pub max_leverage: f64,
    pub max_profit: f64,
    pub min_profit: f64,
    pub max_drawdown: f64,
    pub history: Vec<HistoryRow>,
}

impl BacktestReport {
    /// # Errors
    ///
    /// Fails when the history CSV cannot be written.
    pub fn write_history(&self, path: &Path) -> Result<()> {
        data::write_history(path, &self.history)
    }
}

/// Replay candle data through a strategy and the full order pipeline.
///
/// Per bar, per symbol: update the candle history, let the strategy steer
/// the market state, rebuild desired orders at the bar open, simulate
/// fills, book them, and mark to the close. The first `data_length + 1`
/// bars only accumulate history. A wallet going non-positive ends the run
/// early with whatever was scored so far.
///
/// # Errors
///
/// Fails when `data` has no series for any account symbol, or when a
/// simulated fill cannot be booked.
pub fn run(
    account: &mut Account,
    strategy: &mut dyn Strategy,
    data: &BTreeMap<String, Vec<Bar>>,
    config: &EngineConfig,
) -> Result<BacktestReport> {
    let symbols: Vec<String> = account.markets.keys().cloned().collect();
    let mut bar_count = usize::MAX;
    for symbol in &symbols {
        let series = data
            .get(symbol)
            .with_context(|| format!("no candle data for symbol '{symbol}'"))?;
        bar_count = bar_count.min(series.len());
    }
    if symbols.is_empty() || bar_count == 0 {
        bail!("nothing to backtest");
    }

    info!(
        strategy = strategy.name(),
        bars = bar_count,
        markets = symbols.len(),
        "starting backtest"
    );

    let mut stats = MinMaxStats::default();
    let mut history = Vec::new();
    let mut returns = Vec::new();
    let mut prev_equity: Option<f64> = None;
    let mut stopped_early = false;

    'bars: for i in 0..bar_count {
        for symbol in &symbols {
            let bar = data[symbol][i];
            let state = account.market_mut(symbol).context("missing market")?;
            state.bar = bar;
            state.candles.push(bar);
        }
        if i <= config.data_length {
            continue;
        }

        for symbol in &symbols {
            strategy.on_bar(account, symbol);
            let bar = data[symbol][i];
            let state = account.market_mut(symbol).context("missing market")?;

            setup_orders(state, bar.open);
            let fills = simulate(state, &bar, config.fill_type);
            if let Some(fill) = fills.bid {
                apply_fill(state, fill.price, fill.quantity)?;
            }
            if let Some(fill) = fills.ask {
                apply_fill(state, fill.price, fill.quantity)?;
            }

            mark(state);
            stats.update(state);
            history.push(snapshot(state));

            if state.balance <= 0.0 {
                warn!(symbol = %symbol, balance = state.balance, "wallet exhausted, stopping run");
                stopped_early = true;
            }
        }
        account.aggregate_profit();

        let equity: f64 = account
            .markets
            .values()
            .map(|s| s.balance + s.unrealized_profit)
            .sum();
        if let Some(prev) = prev_equity {
            if prev > 0.0 {
                returns.push((equity - prev) / prev);
            }
        }
        prev_equity = Some(equity);

        if stopped_early {
            break 'bars;
        }
    }

    let final_balance: f64 = account.markets.values().map(|s| s.balance).sum();
    let report = BacktestReport {
        score: score(&returns),
        final_balance,
        max_leverage: stats.max_leverage,
        max_profit: stats.max_profit,
        min_profit: stats.min_profit,
        max_drawdown: stats.max_drawdown,
        history,
    };
    debug!(
        score = report.score,
        final_balance = report.final_balance,
        "backtest finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tradeframe_core::{FillType, MarketConfig, MarketType};

    /// Goes long once warmed up and stays long.
    struct HoldLong;

    impl Strategy for HoldLong {
        fn on_bar(&mut self, account: &mut Account, symbol: &str) {
            let state = account.market_mut(symbol).unwrap();
            state.auto_order_placement = true;
            state.weight = 1;
            state.entry_order_size = 1.0;
        }

        fn name(&self) -> &str {
            "hold_long"
        }
    }

    /// Never trades; only records how often it was consulted.
    struct Counting {
        calls: usize,
    }

    impl Strategy for Counting {
        fn on_bar(&mut self, _account: &mut Account, _symbol: &str) {
            self.calls += 1;
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn series(prices: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar {
                timestamp: start + Duration::minutes(i as i64),
                open: p,
                high: p + 1.0,
                low: p - 1.0,
                close: p,
                volume: 1.0,
            })
            .collect()
    }

    fn config(data_length: usize) -> EngineConfig {
        EngineConfig {
            base_symbol: "XBT".to_string(),
            base_quantity: 1.0,
            data_length,
            fill_type: FillType::Limit,
            live_test_interval: 60,
            markets: vec![MarketConfig {
                symbol: "XBTUSD".to_string(),
                market_type: MarketType::Future,
                tick_size: 0.5,
                quantity_step: 1.0,
                min_order_size: 0.0,
                max_leverage: 1.0,
                bulk_cancel_supported: false,
                denominated_in_underlying: false,
                size_from_max_leverage: false,
                spot_asset: None,
                price_tolerance: 0.0,
                quantity_tolerance: 0.0,
            }],
        }
    }

    #[test]
    fn warmup_bars_never_reach_the_strategy() {
        let cfg = config(5);
        let mut account = cfg.build_account();
        let mut strategy = Counting { calls: 0 };
        let bars = series(&[100.0; 10]);
        let mut data = BTreeMap::new();
        data.insert("XBTUSD".to_string(), bars);
        run(&mut account, &mut strategy, &data, &cfg).unwrap();
        // Bars 0..=5 warm up; bars 6..10 trade.
        assert_eq!(strategy.calls, 4);
    }

    #[test]
    fn hold_long_profits_in_a_rising_market() {
        let cfg = config(2);
        let mut account = cfg.build_account();
        let mut strategy = HoldLong;
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + f64::from(i)).collect();
        let mut data = BTreeMap::new();
        data.insert("XBTUSD".to_string(), series(&prices));
        let report = run(&mut account, &mut strategy, &data, &cfg).unwrap();

        let state = account.market("XBTUSD").unwrap();
        assert!(state.position > 0.0);
        assert!(state.unrealized_profit > 0.0);
        assert!(report.score > 0.0);
        assert!(report.max_leverage > 0.0);
        assert!(!report.history.is_empty());
    }

    #[test]
    fn missing_symbol_data_is_an_error() {
        let cfg = config(2);
        let mut account = cfg.build_account();
        let mut strategy = HoldLong;
        let data = BTreeMap::new();
        assert!(run(&mut account, &mut strategy, &data, &cfg).is_err());
    }

    #[test]
    fn candle_history_accumulates_on_the_state() {
        let cfg = config(3);
        let mut account = cfg.build_account();
        let mut strategy = Counting { calls: 0 };
        let mut data = BTreeMap::new();
        data.insert("XBTUSD".to_string(), series(&[100.0; 8]));
        run(&mut account, &mut strategy, &data, &cfg).unwrap();
        assert_eq!(account.market("XBTUSD").unwrap().candles.len(), 8);
    }

    /// Unwinds whatever position it finds.
    struct Flatten;

    impl Strategy for Flatten {
        fn on_bar(&mut self, account: &mut Account, symbol: &str) {
            let state = account.market_mut(symbol).unwrap();
            state.auto_order_placement = true;
            state.weight = 0;
            state.exit_order_size = 1.0;
        }

        fn name(&self) -> &str {
            "flatten"
        }
    }

    #[test]
    fn exhausted_wallet_ends_the_run_benignly() {
        let cfg = config(1);
        let mut account = cfg.build_account();
        // A deep underwater long; unwinding it after the crash realizes
        // more loss than the wallet holds.
        {
            let state = account.market_mut("XBTUSD").unwrap();
            state.position = 200.0;
            state.average_cost = 1000.0;
            state.should_have_quantity = 200.0;
        }
        let mut strategy = Flatten;
        let mut prices = vec![1000.0, 1000.0];
        prices.extend(std::iter::repeat(2.0).take(20));
        let mut data = BTreeMap::new();
        data.insert("XBTUSD".to_string(), series(&prices));
        let report = run(&mut account, &mut strategy, &data, &cfg).unwrap();
        // The run returned normally and cut off well before the data ran out.
        assert!(report.history.len() < 20);
        assert!(report.final_balance <= 0.0);
    }
}
