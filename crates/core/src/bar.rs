use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle. Timestamps are UTC and series are always ordered
/// ascending by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    #[must_use]
    pub fn flat(price: f64) -> Self {
        Self {
            timestamp: DateTime::<Utc>::MIN_UTC,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }
}

impl Default for Bar {
    fn default() -> Self {
        Self::flat(0.0)
    }
}
