//! Engine configuration, loaded from TOML with environment overrides.

use crate::error::ConfigError;
use crate::market::{Account, MarketInfo, MarketType};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// How simulated fills are priced during a backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillType {
    /// Resting limit orders fill when the bar trades through them.
    Limit,
    /// Everything fills at the bar close.
    Close,
    /// Everything fills at the bar open.
    Open,
    /// Everything fills at the worst price the bar offers.
    Worst,
    /// Everything fills at the open/close midpoint.
    MeanOc,
    /// Everything fills at the high/low midpoint.
    MeanHl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub symbol: String,
    pub market_type: MarketType,
    pub tick_size: f64,
    pub quantity_step: f64,
    #[serde(default)]
    pub min_order_size: f64,
    #[serde(default = "default_max_leverage")]
    pub max_leverage: f64,
    #[serde(default)]
    pub bulk_cancel_supported: bool,
    #[serde(default)]
    pub denominated_in_underlying: bool,
    #[serde(default)]
    pub size_from_max_leverage: bool,
    /// Wallet asset a spot position is held in. Live wallet updates for
    /// this asset land on the position rather than the quote balance.
    #[serde(default)]
    pub spot_asset: Option<String>,
    /// Reconciliation keeps an open order whose price is within this
    /// fraction of the desired price.
    #[serde(default)]
    pub price_tolerance: f64,
    #[serde(default)]
    pub quantity_tolerance: f64,
}

fn default_max_leverage() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wallet asset everything is denominated in.
    pub base_symbol: String,
    pub base_quantity: f64,
    /// Bars of history a strategy needs before its first decision.
    pub data_length: usize,
    #[serde(default = "default_fill_type")]
    pub fill_type: FillType,
    /// Live bars between shadow replays.
    #[serde(default = "default_live_test_interval")]
    pub live_test_interval: usize,
    pub markets: Vec<MarketConfig>,
}

fn default_fill_type() -> FillType {
    FillType::Limit
}

fn default_live_test_interval() -> usize {
    60
}

impl EngineConfig {
    /// Load from a TOML file, then apply `TRADEFRAME_*` environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or the merged
    /// configuration fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("TRADEFRAME_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] for non-positive sizes, duplicate symbols,
    /// or an empty market list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_quantity <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "base_quantity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.markets.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "markets".to_string(),
                message: "at least one market is required".to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for market in &self.markets {
            if !seen.insert(market.symbol.as_str()) {
                return Err(ConfigError::InvalidMarket {
                    symbol: market.symbol.clone(),
                    message: "duplicate symbol".to_string(),
                });
            }
            if market.tick_size <= 0.0 {
                return Err(ConfigError::InvalidMarket {
                    symbol: market.symbol.clone(),
                    message: "tick_size must be positive".to_string(),
                });
            }
            if market.quantity_step <= 0.0 {
                return Err(ConfigError::InvalidMarket {
                    symbol: market.symbol.clone(),
                    message: "quantity_step must be positive".to_string(),
                });
            }
            if market.max_leverage <= 0.0 {
                return Err(ConfigError::InvalidMarket {
                    symbol: market.symbol.clone(),
                    message: "max_leverage must be positive".to_string(),
                });
            }
            if market.min_order_size < 0.0 {
                return Err(ConfigError::InvalidMarket {
                    symbol: market.symbol.clone(),
                    message: "min_order_size cannot be negative".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Construct the starting account described by this configuration.
    #[must_use]
    pub fn build_account(&self) -> Account {
        let mut account = Account::new(&self.base_symbol, self.base_quantity);
        for market in &self.markets {
            account.add_market(MarketInfo {
                symbol: market.symbol.clone(),
                market_type: market.market_type,
                tick_size: market.tick_size,
                quantity_step: market.quantity_step,
                min_order_size: market.min_order_size,
                max_leverage: market.max_leverage,
                bulk_cancel_supported: market.bulk_cancel_supported,
                denominated_in_underlying: market.denominated_in_underlying,
                size_from_max_leverage: market.size_from_max_leverage,
                spot_asset: market.spot_asset.clone(),
            });
        }
        account
    }

    #[must_use]
    pub fn market_config(&self, symbol: &str) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> EngineConfig {
        EngineConfig {
            base_symbol: "XBT".to_string(),
            base_quantity: 1.0,
            data_length: 20,
            fill_type: FillType::Limit,
            live_test_interval: 60,
            markets: vec![MarketConfig {
                symbol: "XBTUSD".to_string(),
                market_type: MarketType::Future,
                tick_size: 0.5,
                quantity_step: 1.0,
                min_order_size: 1.0,
                max_leverage: 1.0,
                bulk_cancel_supported: true,
                denominated_in_underlying: false,
                size_from_max_leverage: false,
                spot_asset: None,
                price_tolerance: 0.0,
                quantity_tolerance: 0.0,
            }],
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let mut config = valid();
        let dup = config.markets[0].clone();
        config.markets.push(dup);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMarket { .. })
        ));
    }

    #[test]
    fn non_positive_tick_size_is_rejected() {
        let mut config = valid();
        config.markets[0].tick_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn build_account_seeds_every_market() {
        let account = valid().build_account();
        assert_eq!(account.markets.len(), 1);
        let state = account.market("XBTUSD").unwrap();
        assert_eq!(state.balance, 1.0);
        assert_eq!(state.info.min_order_size, 1.0);
    }

    #[test]
    fn fill_type_parses_from_snake_case() {
        let parsed: FillType = serde_json::from_str("\"mean_hl\"").unwrap();
        assert_eq!(parsed, FillType::MeanHl);
    }
}
