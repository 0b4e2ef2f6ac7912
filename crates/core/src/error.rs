use thiserror::Error;

/// Errors that invalidate a run before it starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown symbol '{0}' referenced in configuration")]
    UnknownSymbol(String),

    #[error("market '{symbol}': {message}")]
    InvalidMarket { symbol: String, message: String },

    #[error("invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to load configuration")]
    Load(#[from] figment::Error),
}

/// Errors raised while booking fills against a market state.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A fill arrived at a non-positive price. The cost basis would be
    /// corrupted, so the run must stop rather than continue on bad state.
    #[error("fill for '{symbol}' at invalid price {price}")]
    InvalidFillPrice { symbol: String, price: f64 },
}
