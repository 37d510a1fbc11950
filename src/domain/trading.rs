//! Order execution against the latest recorded prices.
//!
//! A trade never mutates rows in place. It reads the account's latest
//! snapshot, applies the fill, revalues the holdings at current prices and
//! appends a new snapshot, so account history stays append-only.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::domain::account::AccountSnapshot;
use crate::domain::error::{LedgerError, TradeError};
use crate::domain::holdings::Holdings;
use crate::ports::store_port::StorePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Outcome of a filled order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeReceipt {
    pub side: TradeSide,
    pub username: String,
    pub ticker: String,
    pub quantity: i64,
    pub price: f64,
    pub total: f64,
    pub cash_after: f64,
    pub balance_after: f64,
    pub at: NaiveDateTime,
}

/// Buy `quantity` shares at the latest recorded price.
pub fn execute_buy(
    store: &dyn StorePort,
    user_id: i64,
    ticker: &str,
    quantity: i64,
    at: NaiveDateTime,
) -> Result<TradeReceipt, LedgerError> {
    if quantity <= 0 {
        return Err(TradeError::InvalidQuantity { quantity }.into());
    }

    let stock = store
        .stock_by_ticker(ticker)?
        .ok_or_else(|| TradeError::UnknownTicker {
            ticker: ticker.to_string(),
        })?;
    let price = store
        .latest_price(&stock.ticker)?
        .ok_or_else(|| TradeError::NoPriceData {
            ticker: stock.ticker.clone(),
        })?;
    let account = store
        .latest_snapshot(user_id)?
        .ok_or(TradeError::UnknownUser { user_id })?;

    let cost = quantity as f64 * price;
    if account.cash < cost {
        return Err(TradeError::InsufficientCash {
            required: cost,
            available: account.cash,
        }
        .into());
    }

    let mut holdings = account.holdings;
    holdings.apply_buy(&stock.ticker, quantity, price);

    let cash_after = account.cash - cost;
    let prices = holding_prices(store, &holdings)?;
    let balance_after = cash_after + holdings.market_value(&prices)?;

    store.append_snapshot(&AccountSnapshot {
        user_id,
        at,
        balance: balance_after,
        cash: cash_after,
        holdings,
    })?;

    Ok(TradeReceipt {
        side: TradeSide::Buy,
        username: account.username,
        ticker: stock.ticker,
        quantity,
        price,
        total: cost,
        cash_after,
        balance_after,
        at,
    })
}

/// Sell `quantity` shares at the latest recorded price.
pub fn execute_sell(
    store: &dyn StorePort,
    user_id: i64,
    ticker: &str,
    quantity: i64,
    at: NaiveDateTime,
) -> Result<TradeReceipt, LedgerError> {
    if quantity <= 0 {
        return Err(TradeError::InvalidQuantity { quantity }.into());
    }

    let stock = store
        .stock_by_ticker(ticker)?
        .ok_or_else(|| TradeError::UnknownTicker {
            ticker: ticker.to_string(),
        })?;
    let price = store
        .latest_price(&stock.ticker)?
        .ok_or_else(|| TradeError::NoPriceData {
            ticker: stock.ticker.clone(),
        })?;
    let account = store
        .latest_snapshot(user_id)?
        .ok_or(TradeError::UnknownUser { user_id })?;

    let mut holdings = account.holdings;
    holdings.apply_sell(&stock.ticker, quantity)?;

    let proceeds = quantity as f64 * price;
    let cash_after = account.cash + proceeds;
    let prices = holding_prices(store, &holdings)?;
    let balance_after = cash_after + holdings.market_value(&prices)?;

    store.append_snapshot(&AccountSnapshot {
        user_id,
        at,
        balance: balance_after,
        cash: cash_after,
        holdings,
    })?;

    Ok(TradeReceipt {
        side: TradeSide::Sell,
        username: account.username,
        ticker: stock.ticker,
        quantity,
        price,
        total: proceeds,
        cash_after,
        balance_after,
        at,
    })
}

/// Latest price for every held ticker, for revaluation.
fn holding_prices(
    store: &dyn StorePort,
    holdings: &Holdings,
) -> Result<HashMap<String, f64>, LedgerError> {
    let mut prices = HashMap::new();
    for ticker in holdings.tickers() {
        let price = store
            .latest_price(ticker)?
            .ok_or_else(|| TradeError::NoPriceData {
                ticker: ticker.to_string(),
            })?;
        prices.insert(ticker.to_string(), price);
    }
    Ok(prices)
}
