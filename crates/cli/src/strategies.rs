//! Built-in demonstration strategies.

use tradeframe_core::{Account, Strategy};

/// Moving-average crossover: long while the fast average is above the
/// slow one, short while below.
pub struct MaCrossover {
    fast_period: usize,
    slow_period: usize,
}

impl MaCrossover {
    #[must_use]
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
        }
    }
}

fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period || period == 0 {
        return None;
    }
    Some(closes[closes.len() - period..].iter().sum::<f64>() / period as f64)
}

impl Strategy for MaCrossover {
    fn on_bar(&mut self, account: &mut Account, symbol: &str) {
        let Some(state) = account.market_mut(symbol) else {
            return;
        };
        let closes: Vec<f64> = state.candles.iter().map(|b| b.close).collect();
        let (Some(fast), Some(slow)) = (
            sma(&closes, self.fast_period),
            sma(&closes, self.slow_period),
        ) else {
            return;
        };

        state.auto_order_placement = true;
        state.entry_order_size = 0.2;
        state.exit_order_size = 0.5;
        state.weight = if fast > slow { 1 } else { -1 };
    }

    fn name(&self) -> &str {
        "ma_crossover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeframe_core::market::MarketInfo;
    use tradeframe_core::Bar;

    #[test]
    fn sma_needs_a_full_window() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
    }

    #[test]
    fn crossover_flips_the_weight() {
        let mut account = Account::new("XBT", 1.0);
        account.add_market(MarketInfo::future("XBTUSD"));
        let mut strategy = MaCrossover::new(2, 4);

        let state = account.market_mut("XBTUSD").unwrap();
        for price in [100.0, 100.0, 101.0, 103.0] {
            state.candles.push(Bar::flat(price));
        }
        strategy.on_bar(&mut account, "XBTUSD");
        assert_eq!(account.market("XBTUSD").unwrap().weight, 1);

        let state = account.market_mut("XBTUSD").unwrap();
        for price in [99.0, 95.0] {
            state.candles.push(Bar::flat(price));
        }
        strategy.on_bar(&mut account, "XBTUSD");
        assert_eq!(account.market("XBTUSD").unwrap().weight, -1);
    }
}
