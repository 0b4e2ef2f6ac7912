//! Strategy parameter store.
//!
//! Strategies stash tuning values here keyed by symbol and name, so live
//! operators can inspect and override them without recompiling. The store
//! is plain owned state on the engine, threaded through explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    values: BTreeMap<(String, String), ParamValue>,
}

impl ParamStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, symbol: &str, name: &str, value: ParamValue) {
        self.values
            .insert((symbol.to_string(), name.to_string()), value);
    }

    #[must_use]
    pub fn get(&self, symbol: &str, name: &str) -> Option<&ParamValue> {
        self.values.get(&(symbol.to_string(), name.to_string()))
    }

    #[must_use]
    pub fn get_float(&self, symbol: &str, name: &str) -> Option<f64> {
        match self.get(symbol, name) {
            Some(ParamValue::Float(v)) => Some(*v),
            Some(ParamValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_int(&self, symbol: &str, name: &str) -> Option<i64> {
        match self.get(symbol, name) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_bool(&self, symbol: &str, name: &str) -> Option<bool> {
        match self.get(symbol, name) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// All parameters for one symbol, in name order.
    #[must_use]
    pub fn for_symbol(&self, symbol: &str) -> Vec<(&str, &ParamValue)> {
        self.values
            .iter()
            .filter(|((s, _), _)| s == symbol)
            .map(|((_, n), v)| (n.as_str(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_keyed_by_symbol_and_name() {
        let mut store = ParamStore::new();
        store.set("XBTUSD", "lookback", ParamValue::Int(20));
        store.set("ETHUSD", "lookback", ParamValue::Int(50));

        assert_eq!(store.get_int("XBTUSD", "lookback"), Some(20));
        assert_eq!(store.get_int("ETHUSD", "lookback"), Some(50));
        assert_eq!(store.get_int("XBTUSD", "missing"), None);
    }

    #[test]
    fn float_accessor_widens_ints() {
        let mut store = ParamStore::new();
        store.set("XBTUSD", "threshold", ParamValue::Int(3));
        assert_eq!(store.get_float("XBTUSD", "threshold"), Some(3.0));

        store.set("XBTUSD", "threshold", ParamValue::Float(0.5));
        assert_eq!(store.get_float("XBTUSD", "threshold"), Some(0.5));
    }

    #[test]
    fn symbol_listing_is_name_ordered() {
        let mut store = ParamStore::new();
        store.set("XBTUSD", "beta", ParamValue::Bool(true));
        store.set("XBTUSD", "alpha", ParamValue::Float(1.0));
        let listed: Vec<&str> = store.for_symbol("XBTUSD").iter().map(|(n, _)| *n).collect();
        assert_eq!(listed, vec!["alpha", "beta"]);
    }
}
