//! Portfolio document: per-ticker lots with volume-weighted average price.
//!
//! The serialized form is the UserHistory `portfolio` column, a JSON object
//! keyed by ticker: `{"AAPL": {"quantity": 10, "average_price": 50.0}}`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::error::TradeError;

/// An open lot in one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub quantity: i64,
    pub average_price: f64,
}

/// Map of ticker to open lot. Ordered so the serialized document is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Holdings {
    lots: BTreeMap<String, Lot>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn get(&self, ticker: &str) -> Option<&Lot> {
        self.lots.get(ticker)
    }

    /// Shares held in `ticker`, zero when absent.
    pub fn quantity_of(&self, ticker: &str) -> i64 {
        self.lots.get(ticker).map_or(0, |lot| lot.quantity)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> + '_ {
        self.lots.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Lot)> + '_ {
        self.lots.iter().map(|(ticker, lot)| (ticker.as_str(), lot))
    }

    /// Add shares, folding the fill into the volume-weighted average price:
    /// `new_avg = (old_qty * old_avg + qty * price) / (old_qty + qty)`.
    pub fn apply_buy(&mut self, ticker: &str, quantity: i64, price: f64) {
        match self.lots.get_mut(ticker) {
            Some(lot) => {
                let new_quantity = lot.quantity + quantity;
                lot.average_price = (lot.quantity as f64 * lot.average_price
                    + quantity as f64 * price)
                    / new_quantity as f64;
                lot.quantity = new_quantity;
            }
            None => {
                self.lots.insert(
                    ticker.to_string(),
                    Lot {
                        quantity,
                        average_price: price,
                    },
                );
            }
        }
    }

    /// Remove shares. Selling the whole lot drops the ticker from the document.
    pub fn apply_sell(&mut self, ticker: &str, quantity: i64) -> Result<(), TradeError> {
        let lot = self
            .lots
            .get_mut(ticker)
            .ok_or_else(|| TradeError::NotHeld {
                ticker: ticker.to_string(),
            })?;

        if lot.quantity < quantity {
            return Err(TradeError::InsufficientShares {
                ticker: ticker.to_string(),
                requested: quantity,
                held: lot.quantity,
            });
        }

        if lot.quantity == quantity {
            self.lots.remove(ticker);
        } else {
            lot.quantity -= quantity;
        }
        Ok(())
    }

    /// Sum of quantity times latest price over every held ticker.
    pub fn market_value(&self, prices: &HashMap<String, f64>) -> Result<f64, TradeError> {
        let mut total = 0.0;
        for (ticker, lot) in &self.lots {
            let price = prices.get(ticker).ok_or_else(|| TradeError::NoPriceData {
                ticker: ticker.clone(),
            })?;
            total += lot.quantity as f64 * price;
        }
        Ok(total)
    }
}
