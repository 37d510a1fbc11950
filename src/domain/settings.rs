//! Market configuration: defaults and validation.

use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_STARTING_CASH: f64 = 100_000.0;
pub const DEFAULT_RETURN_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_MAX_SYMBOL_LEN: usize = 5;

/// Tunables read from the `[market]` section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSettings {
    /// Cash granted to a newly registered account.
    pub starting_cash: f64,
    /// Lookback window for stock and leaderboard returns.
    pub return_window_hours: i64,
    /// Longest ticker symbol the catalog seeder will derive.
    pub max_symbol_len: usize,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            starting_cash: DEFAULT_STARTING_CASH,
            return_window_hours: DEFAULT_RETURN_WINDOW_HOURS,
            max_symbol_len: DEFAULT_MAX_SYMBOL_LEN,
        }
    }
}

impl MarketSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        validate_market_config(config)?;
        Ok(Self {
            starting_cash: config.get_double("market", "starting_cash", DEFAULT_STARTING_CASH),
            return_window_hours: config.get_int(
                "market",
                "return_window_hours",
                DEFAULT_RETURN_WINDOW_HOURS,
            ),
            max_symbol_len: config.get_int("market", "max_symbol_len", DEFAULT_MAX_SYMBOL_LEN as i64)
                as usize,
        })
    }

    pub fn return_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.return_window_hours)
    }
}

pub fn validate_market_config(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    validate_starting_cash(config)?;
    validate_return_window(config)?;
    validate_max_symbol_len(config)?;
    Ok(())
}

fn validate_starting_cash(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let value = config.get_double("market", "starting_cash", DEFAULT_STARTING_CASH);
    if value <= 0.0 {
        return Err(LedgerError::ConfigInvalid {
            section: "market".to_string(),
            key: "starting_cash".to_string(),
            reason: "starting_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_return_window(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let value = config.get_int("market", "return_window_hours", DEFAULT_RETURN_WINDOW_HOURS);
    if value < 1 {
        return Err(LedgerError::ConfigInvalid {
            section: "market".to_string(),
            key: "return_window_hours".to_string(),
            reason: "return_window_hours must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_max_symbol_len(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let value = config.get_int("market", "max_symbol_len", DEFAULT_MAX_SYMBOL_LEN as i64);
    if value < 1 {
        return Err(LedgerError::ConfigInvalid {
            section: "market".to_string(),
            key: "max_symbol_len".to_string(),
            reason: "max_symbol_len must be at least 1".to_string(),
        });
    }
    Ok(())
}
