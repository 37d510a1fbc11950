//! User accounts and their point-in-time snapshots.

use chrono::NaiveDateTime;

use super::holdings::Holdings;

/// A registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub user_id: i64,
    pub username: String,
}

/// One UserHistory row: the account state captured at a single timestamp.
///
/// `balance` is cash plus the market value of the holdings at that time.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub user_id: i64,
    pub at: NaiveDateTime,
    pub balance: f64,
    pub cash: f64,
    pub holdings: Holdings,
}

impl AccountSnapshot {
    /// The snapshot written when an account is first registered: all cash,
    /// nothing held.
    pub fn opening(user_id: i64, at: NaiveDateTime, starting_cash: f64) -> Self {
        Self {
            user_id,
            at,
            balance: starting_cash,
            cash: starting_cash,
            holdings: Holdings::new(),
        }
    }
}

/// An account joined with its latest snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountView {
    pub user_id: i64,
    pub username: String,
    pub at: NaiveDateTime,
    pub balance: f64,
    pub cash: f64,
    pub holdings: Holdings,
}

/// One point on an account's balance curve.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancePoint {
    pub at: NaiveDateTime,
    pub balance: f64,
    pub cash: f64,
}

/// A leaderboard entry, ordered by balance descending. `return_pct` is the
/// percent change against the earliest balance inside the return window.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub username: String,
    pub balance: f64,
    pub return_pct: f64,
}
