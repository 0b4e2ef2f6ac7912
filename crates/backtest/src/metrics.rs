//! Backtest scoring and extreme-value tracking.

use tradeframe_core::history::unrealized_at;
use tradeframe_core::market::MarketState;

/// Minutes in a 365-day year, the annualization base for minute bars.
const MINUTES_PER_YEAR: f64 = 365.0 * 24.0 * 60.0;

/// Annualized risk-adjusted score over per-bar fractional equity returns.
/// A degenerate series (no variance and no mean) scores the sentinel
/// -100.0 instead of propagating NaN.
#[must_use]
pub fn score(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return -100.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let score = mean / variance.sqrt() * MINUTES_PER_YEAR.sqrt();
    if score.is_nan() {
        -100.0
    } else {
        score
    }
}

/// Running extremes over a backtest: best and worst open profit seen at
/// any bar extreme, peak leverage, and the deepest equity drawdown.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxStats {
    pub max_profit: f64,
    pub min_profit: f64,
    pub max_leverage: f64,
    pub max_drawdown: f64,
    peak_equity: f64,
}

impl Default for MinMaxStats {
    fn default() -> Self {
        Self {
            max_profit: 0.0,
            min_profit: 0.0,
            max_leverage: 0.0,
            max_drawdown: 0.0,
            peak_equity: f64::MIN,
        }
    }
}

impl MinMaxStats {
    /// Fold in one marked market state after its bar has been processed.
    pub fn update(&mut self, state: &MarketState) {
        let (best_price, worst_price) = if state.position >= 0.0 {
            (state.bar.high, state.bar.low)
        } else {
            (state.bar.low, state.bar.high)
        };
        let best = unrealized_at(state, best_price) + state.realized_profit;
        let worst = unrealized_at(state, worst_price) + state.realized_profit;
        if best > self.max_profit {
            self.max_profit = best;
        }
        if worst < self.min_profit {
            self.min_profit = worst;
        }
        if state.leverage > self.max_leverage {
            self.max_leverage = state.leverage;
        }

        let equity = state.balance + state.unrealized_profit;
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }
}
