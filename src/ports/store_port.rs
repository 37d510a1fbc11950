//! Storage access port trait.

use chrono::{Duration, NaiveDateTime};

use crate::domain::account::{AccountSnapshot, AccountView, BalancePoint, LeaderboardRow};
use crate::domain::error::LedgerError;
use crate::domain::instrument::{PricePoint, Stock, StockSummary};

pub trait StorePort {
    /// Idempotent: registering an existing ticker returns its id unchanged.
    fn register_stock(&self, name: &str, ticker: &str) -> Result<i64, LedgerError>;

    fn stock_by_ticker(&self, ticker: &str) -> Result<Option<Stock>, LedgerError>;

    fn company_exists(&self, name: &str) -> Result<bool, LedgerError>;

    fn record_price(
        &self,
        ticker: &str,
        price: f64,
        volume: i64,
        at: NaiveDateTime,
    ) -> Result<(), LedgerError>;

    fn latest_price(&self, ticker: &str) -> Result<Option<f64>, LedgerError>;

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>, LedgerError>;

    fn price_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, LedgerError>;

    fn list_stocks(
        &self,
        as_of: NaiveDateTime,
        window: Duration,
    ) -> Result<Vec<StockSummary>, LedgerError>;

    /// Returns false when the user already exists; no opening snapshot is
    /// written in that case.
    fn add_user(
        &self,
        user_id: i64,
        username: &str,
        starting_cash: f64,
        at: NaiveDateTime,
    ) -> Result<bool, LedgerError>;

    fn user_exists(&self, user_id: i64) -> Result<bool, LedgerError>;

    fn latest_snapshot(&self, user_id: i64) -> Result<Option<AccountView>, LedgerError>;

    fn all_snapshots(&self) -> Result<Vec<AccountView>, LedgerError>;

    fn append_snapshot(&self, snapshot: &AccountSnapshot) -> Result<(), LedgerError>;

    fn balance_history(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<BalancePoint>, LedgerError>;

    fn leaderboard(
        &self,
        as_of: NaiveDateTime,
        window: Duration,
    ) -> Result<Vec<LeaderboardRow>, LedgerError>;
}
