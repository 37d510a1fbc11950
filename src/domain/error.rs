//! Domain error types.

/// Errors raised by the trading bookkeeping itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("unknown ticker {ticker}")]
    UnknownTicker { ticker: String },

    #[error("unknown user {user_id}")]
    UnknownUser { user_id: i64 },

    #[error("no price data for {ticker}")]
    NoPriceData { ticker: String },

    #[error("insufficient cash: need {required:.2}, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("insufficient shares of {ticker}: asked {requested}, holding {held}")]
    InsufficientShares {
        ticker: String,
        requested: i64,
        held: i64,
    },

    #[error("no holding of {ticker}")]
    NotHeld { ticker: String },

    #[error("quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i64 },
}

/// Top-level error type for marketledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("constraint violation: {reason}")]
    Constraint { reason: String },

    #[error("encoding error: {reason}")]
    Encoding { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("catalog error: {reason}")]
    Catalog { reason: String },

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err {
            LedgerError::Io(_) => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::Database { .. }
            | LedgerError::DatabaseQuery { .. }
            | LedgerError::Constraint { .. }
            | LedgerError::Encoding { .. } => 3,
            LedgerError::Catalog { .. } => 4,
            LedgerError::Trade(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
