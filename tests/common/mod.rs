#![allow(dead_code)]

use chrono::{Duration, NaiveDateTime};
use marketledger::domain::account::{AccountSnapshot, AccountView, BalancePoint, LeaderboardRow};
use marketledger::domain::error::{LedgerError, TradeError};
use marketledger::domain::instrument::{percent_change, PricePoint, Stock, StockSummary};
use marketledger::ports::store_port::StorePort;
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory store mirroring the SQLite adapter's semantics, including the
/// composite-key and foreign-key rejections.
pub struct MockStore {
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    stocks: Vec<Stock>,
    prices: Vec<PricePoint>,
    users: HashMap<i64, String>,
    snapshots: Vec<AccountSnapshot>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
        }
    }

    pub fn with_stock(self, ticker: &str, name: &str) -> Self {
        self.register_stock(name, ticker).unwrap();
        self
    }

    pub fn with_price(self, ticker: &str, price: f64, at: NaiveDateTime) -> Self {
        self.record_price(ticker, price, 0, at).unwrap();
        self
    }

    pub fn with_user(self, user_id: i64, username: &str, cash: f64, at: NaiveDateTime) -> Self {
        assert!(self.add_user(user_id, username, cash, at).unwrap());
        self
    }
}

impl StorePort for MockStore {
    fn register_stock(&self, name: &str, ticker: &str) -> Result<i64, LedgerError> {
        let mut state = self.state.borrow_mut();
        if let Some(stock) = state.stocks.iter().find(|s| s.ticker == ticker) {
            return Ok(stock.id);
        }
        let id = state.stocks.len() as i64 + 1;
        state.stocks.push(Stock {
            id,
            ticker: ticker.to_string(),
            name: name.to_string(),
        });
        Ok(id)
    }

    fn stock_by_ticker(&self, ticker: &str) -> Result<Option<Stock>, LedgerError> {
        let state = self.state.borrow();
        Ok(state.stocks.iter().find(|s| s.ticker == ticker).cloned())
    }

    fn company_exists(&self, name: &str) -> Result<bool, LedgerError> {
        let state = self.state.borrow();
        Ok(state.stocks.iter().any(|s| s.name == name))
    }

    fn record_price(
        &self,
        ticker: &str,
        price: f64,
        volume: i64,
        at: NaiveDateTime,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.borrow_mut();
        if !state.stocks.iter().any(|s| s.ticker == ticker) {
            return Err(TradeError::UnknownTicker {
                ticker: ticker.to_string(),
            }
            .into());
        }
        if state.prices.iter().any(|p| p.ticker == ticker && p.at == at) {
            return Err(LedgerError::Constraint {
                reason: format!("duplicate price row for {ticker} at {at}"),
            });
        }
        state.prices.push(PricePoint {
            ticker: ticker.to_string(),
            at,
            price,
            volume,
        });
        Ok(())
    }

    fn latest_price(&self, ticker: &str) -> Result<Option<f64>, LedgerError> {
        let state = self.state.borrow();
        Ok(state
            .prices
            .iter()
            .filter(|p| p.ticker == ticker)
            .max_by_key(|p| p.at)
            .map(|p| p.price))
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        let state = self.state.borrow();
        let mut points: Vec<PricePoint> = state
            .prices
            .iter()
            .filter(|p| p.ticker == ticker && p.at >= start && p.at <= end)
            .cloned()
            .collect();
        points.sort_by_key(|p| p.at);
        Ok(points)
    }

    fn price_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, LedgerError> {
        let state = self.state.borrow();
        let series: Vec<&PricePoint> = state
            .prices
            .iter()
            .filter(|p| p.ticker == ticker)
            .collect();
        if series.is_empty() {
            return Ok(None);
        }
        let first = series.iter().map(|p| p.at).min().unwrap();
        let last = series.iter().map(|p| p.at).max().unwrap();
        Ok(Some((first, last, series.len())))
    }

    fn list_stocks(
        &self,
        as_of: NaiveDateTime,
        window: Duration,
    ) -> Result<Vec<StockSummary>, LedgerError> {
        let state = self.state.borrow();
        let cutoff = as_of - window;
        let mut rows = Vec::new();
        for stock in &state.stocks {
            let mut series: Vec<&PricePoint> = state
                .prices
                .iter()
                .filter(|p| p.ticker == stock.ticker)
                .collect();
            if series.is_empty() {
                continue;
            }
            series.sort_by_key(|p| p.at);
            let latest = series.last().unwrap();
            let baseline = series.iter().find(|p| p.at >= cutoff).map(|p| p.price);
            rows.push(StockSummary {
                ticker: stock.ticker.clone(),
                name: stock.name.clone(),
                price: latest.price,
                return_pct: percent_change(latest.price, baseline),
            });
        }
        rows.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(rows)
    }

    fn add_user(
        &self,
        user_id: i64,
        username: &str,
        starting_cash: f64,
        at: NaiveDateTime,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state.borrow_mut();
        // INSERT OR IGNORE semantics: a taken user_id or username both
        // read as "already exists".
        if state.users.contains_key(&user_id) || state.users.values().any(|n| n == username) {
            return Ok(false);
        }
        state.users.insert(user_id, username.to_string());
        state
            .snapshots
            .push(AccountSnapshot::opening(user_id, at, starting_cash));
        Ok(true)
    }

    fn user_exists(&self, user_id: i64) -> Result<bool, LedgerError> {
        let state = self.state.borrow();
        Ok(state.users.contains_key(&user_id))
    }

    fn latest_snapshot(&self, user_id: i64) -> Result<Option<AccountView>, LedgerError> {
        let state = self.state.borrow();
        let Some(username) = state.users.get(&user_id) else {
            return Ok(None);
        };
        let Some(snap) = state
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.at)
        else {
            return Ok(None);
        };
        Ok(Some(AccountView {
            user_id,
            username: username.clone(),
            at: snap.at,
            balance: snap.balance,
            cash: snap.cash,
            holdings: snap.holdings.clone(),
        }))
    }

    fn all_snapshots(&self) -> Result<Vec<AccountView>, LedgerError> {
        let ids: Vec<i64> = {
            let state = self.state.borrow();
            let mut ids: Vec<i64> = state.users.keys().copied().collect();
            ids.sort_unstable();
            ids
        };
        let mut views = Vec::new();
        for id in ids {
            if let Some(view) = self.latest_snapshot(id)? {
                views.push(view);
            }
        }
        Ok(views)
    }

    fn append_snapshot(&self, snapshot: &AccountSnapshot) -> Result<(), LedgerError> {
        let mut state = self.state.borrow_mut();
        if !state.users.contains_key(&snapshot.user_id) {
            return Err(LedgerError::Constraint {
                reason: format!("no user {} for snapshot", snapshot.user_id),
            });
        }
        if state
            .snapshots
            .iter()
            .any(|s| s.user_id == snapshot.user_id && s.at == snapshot.at)
        {
            return Err(LedgerError::Constraint {
                reason: format!(
                    "duplicate snapshot for user {} at {}",
                    snapshot.user_id, snapshot.at
                ),
            });
        }
        state.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn balance_history(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<BalancePoint>, LedgerError> {
        let state = self.state.borrow();
        let mut points: Vec<BalancePoint> = state
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id && s.at >= start && s.at <= end)
            .map(|s| BalancePoint {
                at: s.at,
                balance: s.balance,
                cash: s.cash,
            })
            .collect();
        points.sort_by_key(|p| p.at);
        Ok(points)
    }

    fn leaderboard(
        &self,
        as_of: NaiveDateTime,
        window: Duration,
    ) -> Result<Vec<LeaderboardRow>, LedgerError> {
        let state = self.state.borrow();
        let cutoff = as_of - window;
        let mut ids: Vec<i64> = state.users.keys().copied().collect();
        ids.sort_unstable();
        let mut rows = Vec::new();
        for id in ids {
            let mut series: Vec<&AccountSnapshot> = state
                .snapshots
                .iter()
                .filter(|s| s.user_id == id)
                .collect();
            if series.is_empty() {
                continue;
            }
            series.sort_by_key(|s| s.at);
            let latest = series.last().unwrap();
            let baseline = series.iter().find(|s| s.at >= cutoff).map(|s| s.balance);
            rows.push(LeaderboardRow {
                username: state.users[&id].clone(),
                balance: latest.balance,
                return_pct: percent_change(latest.balance, baseline),
            });
        }
        rows.sort_by(|a, b| b.balance.partial_cmp(&a.balance).unwrap());
        Ok(rows)
    }
}

pub fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").unwrap()
}
