//! SQLite storage adapter.

use chrono::{Duration, NaiveDateTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::account::{AccountSnapshot, AccountView, BalancePoint, LeaderboardRow};
use crate::domain::error::{LedgerError, TradeError};
use crate::domain::holdings::Holdings;
use crate::domain::instrument::{PricePoint, Stock, StockSummary, percent_change};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

/// Timestamps are stored as fixed-width ISO-8601 text so lexicographic
/// ordering matches chronological ordering.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> LedgerError {
    LedgerError::Database {
        reason: e.to_string(),
    }
}

fn sql_err(e: rusqlite::Error) -> LedgerError {
    if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
        LedgerError::Constraint {
            reason: e.to_string(),
        }
    } else {
        LedgerError::DatabaseQuery {
            reason: e.to_string(),
        }
    }
}

// SQLite leaves foreign key enforcement off unless every connection opts in.
fn enable_foreign_keys(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

fn encode_ts(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn decode_ts(raw: &str, idx: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn decode_holdings(raw: &str, idx: usize) -> Result<Holdings, rusqlite::Error> {
    if raw.is_empty() {
        return Ok(Holdings::new());
    }
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn encode_holdings(holdings: &Holdings) -> Result<String, LedgerError> {
    serde_json::to_string(holdings).map_err(|e| LedgerError::Encoding {
        reason: e.to_string(),
    })
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| LedgerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path).with_init(enable_foreign_keys);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, LedgerError> {
        // A single pooled connection, otherwise each checkout would see a
        // different empty database.
        let manager = SqliteConnectionManager::memory().with_init(enable_foreign_keys);
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS Stocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS StockHistory (
                timestamp TEXT NOT NULL,
                stock_id INTEGER NOT NULL,
                price REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (timestamp, stock_id),
                FOREIGN KEY (stock_id) REFERENCES Stocks(id)
            );
            CREATE TABLE IF NOT EXISTS Users (
                user_id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS UserHistory (
                timestamp TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                balance REAL NOT NULL,
                cash REAL NOT NULL,
                portfolio TEXT NOT NULL,
                PRIMARY KEY (timestamp, user_id),
                FOREIGN KEY (user_id) REFERENCES Users(user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_stock_history_stock_ts
                ON StockHistory(stock_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_user_history_user_ts
                ON UserHistory(user_id, timestamp);",
        )
        .map_err(sql_err)?;

        Ok(())
    }
}

impl StorePort for SqliteStore {
    fn register_stock(&self, name: &str, ticker: &str) -> Result<i64, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT OR IGNORE INTO Stocks (ticker, name) VALUES (?1, ?2)",
            params![ticker, name],
        )
        .map_err(sql_err)?;

        let id: i64 = conn
            .query_row(
                "SELECT id FROM Stocks WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .map_err(sql_err)?;

        Ok(id)
    }

    fn stock_by_ticker(&self, ticker: &str) -> Result<Option<Stock>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT id, ticker, name FROM Stocks WHERE ticker = ?1",
            params![ticker],
            |row| {
                Ok(Stock {
                    id: row.get(0)?,
                    ticker: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(sql_err)
    }

    fn company_exists(&self, name: &str) -> Result<bool, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM Stocks WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;

        Ok(row.is_some())
    }

    fn record_price(
        &self,
        ticker: &str,
        price: f64,
        volume: i64,
        at: NaiveDateTime,
    ) -> Result<(), LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let stock_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM Stocks WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        let stock_id = stock_id.ok_or_else(|| TradeError::UnknownTicker {
            ticker: ticker.to_string(),
        })?;

        conn.execute(
            "INSERT INTO StockHistory (timestamp, stock_id, price, volume)
             VALUES (?1, ?2, ?3, ?4)",
            params![encode_ts(at), stock_id, price, volume],
        )
        .map_err(sql_err)?;

        Ok(())
    }

    fn latest_price(&self, ticker: &str) -> Result<Option<f64>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT sh.price FROM StockHistory sh
             JOIN Stocks s ON s.id = sh.stock_id
             WHERE s.ticker = ?1
             ORDER BY sh.timestamp DESC
             LIMIT 1",
            params![ticker],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = "SELECT sh.timestamp, sh.price, sh.volume
                     FROM StockHistory sh
                     JOIN Stocks s ON s.id = sh.stock_id
                     WHERE s.ticker = ?1 AND sh.timestamp >= ?2 AND sh.timestamp <= ?3
                     ORDER BY sh.timestamp ASC";

        let mut stmt = conn.prepare(query).map_err(sql_err)?;

        let rows = stmt
            .query_map(params![ticker, encode_ts(start), encode_ts(end)], |row| {
                let raw: String = row.get(0)?;
                Ok(PricePoint {
                    ticker: ticker.to_string(),
                    at: decode_ts(&raw, 0)?,
                    price: row.get(1)?,
                    volume: row.get(2)?,
                })
            })
            .map_err(sql_err)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(sql_err)?);
        }

        Ok(points)
    }

    fn price_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = "SELECT MIN(sh.timestamp), MAX(sh.timestamp), COUNT(*)
                     FROM StockHistory sh
                     JOIN Stocks s ON s.id = sh.stock_id
                     WHERE s.ticker = ?1";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![ticker], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(sql_err)?;

        match result {
            (Some(first), Some(last), count) if count > 0 => {
                let first = NaiveDateTime::parse_from_str(&first, TIMESTAMP_FORMAT).map_err(
                    |e: chrono::ParseError| LedgerError::Database {
                        reason: e.to_string(),
                    },
                )?;
                let last = NaiveDateTime::parse_from_str(&last, TIMESTAMP_FORMAT).map_err(
                    |e: chrono::ParseError| LedgerError::Database {
                        reason: e.to_string(),
                    },
                )?;
                Ok(Some((first, last, count as usize)))
            }
            _ => Ok(None),
        }
    }

    fn list_stocks(
        &self,
        as_of: NaiveDateTime,
        window: Duration,
    ) -> Result<Vec<StockSummary>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        // Latest row per stock, plus the earliest price inside the return
        // window as the baseline.
        let query = "SELECT s.ticker, s.name, sh.price,
                         (SELECT price FROM StockHistory
                          WHERE stock_id = s.id AND timestamp >= ?1
                          ORDER BY timestamp ASC
                          LIMIT 1) AS baseline_price
                     FROM Stocks s
                     JOIN (
                         SELECT stock_id, MAX(timestamp) AS latest_timestamp
                         FROM StockHistory
                         GROUP BY stock_id
                     ) lh ON s.id = lh.stock_id
                     JOIN StockHistory sh
                         ON sh.stock_id = lh.stock_id AND sh.timestamp = lh.latest_timestamp
                     ORDER BY s.ticker ASC";

        let cutoff = encode_ts(as_of - window);
        let mut stmt = conn.prepare(query).map_err(sql_err)?;

        let rows = stmt
            .query_map(params![cutoff], |row| {
                let price: f64 = row.get(2)?;
                let baseline: Option<f64> = row.get(3)?;
                Ok(StockSummary {
                    ticker: row.get(0)?,
                    name: row.get(1)?,
                    price,
                    return_pct: percent_change(price, baseline),
                })
            })
            .map_err(sql_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row.map_err(sql_err)?);
        }

        Ok(summaries)
    }

    fn add_user(
        &self,
        user_id: i64,
        username: &str,
        starting_cash: f64,
        at: NaiveDateTime,
    ) -> Result<bool, LedgerError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO Users (user_id, username) VALUES (?1, ?2)",
                params![user_id, username],
            )
            .map_err(sql_err)?;
        if inserted == 0 {
            return Ok(false);
        }

        let opening = AccountSnapshot::opening(user_id, at, starting_cash);
        tx.execute(
            "INSERT INTO UserHistory (timestamp, user_id, balance, cash, portfolio)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                encode_ts(opening.at),
                opening.user_id,
                opening.balance,
                opening.cash,
                encode_holdings(&opening.holdings)?
            ],
        )
        .map_err(sql_err)?;

        tx.commit().map_err(sql_err)?;
        Ok(true)
    }

    fn user_exists(&self, user_id: i64) -> Result<bool, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM Users WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;

        Ok(row.is_some())
    }

    fn latest_snapshot(&self, user_id: i64) -> Result<Option<AccountView>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = "SELECT u.username, uh.timestamp, uh.balance, uh.cash, uh.portfolio
                     FROM Users u
                     JOIN (
                         SELECT * FROM UserHistory
                         WHERE user_id = ?1
                         ORDER BY timestamp DESC
                         LIMIT 1
                     ) uh ON u.user_id = uh.user_id";

        conn.query_row(query, params![user_id], |row| {
            let raw_ts: String = row.get(1)?;
            let raw_holdings: String = row.get(4)?;
            Ok(AccountView {
                user_id,
                username: row.get(0)?,
                at: decode_ts(&raw_ts, 1)?,
                balance: row.get(2)?,
                cash: row.get(3)?,
                holdings: decode_holdings(&raw_holdings, 4)?,
            })
        })
        .optional()
        .map_err(sql_err)
    }

    fn all_snapshots(&self) -> Result<Vec<AccountView>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = "SELECT uh.user_id, u.username, uh.timestamp, uh.balance, uh.cash, uh.portfolio
                     FROM Users u
                     JOIN (
                         SELECT user_id, MAX(timestamp) AS latest_timestamp
                         FROM UserHistory
                         GROUP BY user_id
                     ) lh ON u.user_id = lh.user_id
                     JOIN UserHistory uh
                         ON uh.user_id = lh.user_id AND uh.timestamp = lh.latest_timestamp
                     ORDER BY uh.user_id ASC";

        let mut stmt = conn.prepare(query).map_err(sql_err)?;

        let rows = stmt
            .query_map([], |row| {
                let raw_ts: String = row.get(2)?;
                let raw_holdings: String = row.get(5)?;
                Ok(AccountView {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    at: decode_ts(&raw_ts, 2)?,
                    balance: row.get(3)?,
                    cash: row.get(4)?,
                    holdings: decode_holdings(&raw_holdings, 5)?,
                })
            })
            .map_err(sql_err)?;

        let mut views = Vec::new();
        for row in rows {
            views.push(row.map_err(sql_err)?);
        }

        Ok(views)
    }

    fn append_snapshot(&self, snapshot: &AccountSnapshot) -> Result<(), LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO UserHistory (timestamp, user_id, balance, cash, portfolio)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                encode_ts(snapshot.at),
                snapshot.user_id,
                snapshot.balance,
                snapshot.cash,
                encode_holdings(&snapshot.holdings)?
            ],
        )
        .map_err(sql_err)?;

        Ok(())
    }

    fn balance_history(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<BalancePoint>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = "SELECT timestamp, balance, cash FROM UserHistory
                     WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
                     ORDER BY timestamp ASC";

        let mut stmt = conn.prepare(query).map_err(sql_err)?;

        let rows = stmt
            .query_map(params![user_id, encode_ts(start), encode_ts(end)], |row| {
                let raw: String = row.get(0)?;
                Ok(BalancePoint {
                    at: decode_ts(&raw, 0)?,
                    balance: row.get(1)?,
                    cash: row.get(2)?,
                })
            })
            .map_err(sql_err)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(sql_err)?);
        }

        Ok(points)
    }

    fn leaderboard(
        &self,
        as_of: NaiveDateTime,
        window: Duration,
    ) -> Result<Vec<LeaderboardRow>, LedgerError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = "SELECT u.username, uh.balance,
                         (SELECT balance FROM UserHistory
                          WHERE user_id = uh.user_id AND timestamp >= ?1
                          ORDER BY timestamp ASC
                          LIMIT 1) AS baseline_balance
                     FROM Users u
                     JOIN (
                         SELECT user_id, MAX(timestamp) AS latest_timestamp
                         FROM UserHistory
                         GROUP BY user_id
                     ) lh ON u.user_id = lh.user_id
                     JOIN UserHistory uh
                         ON uh.user_id = lh.user_id AND uh.timestamp = lh.latest_timestamp
                     ORDER BY uh.balance DESC";

        let cutoff = encode_ts(as_of - window);
        let mut stmt = conn.prepare(query).map_err(sql_err)?;

        let rows = stmt
            .query_map(params![cutoff], |row| {
                let balance: f64 = row.get(1)?;
                let baseline: Option<f64> = row.get(2)?;
                Ok(LeaderboardRow {
                    username: row.get(0)?,
                    balance,
                    return_pct: percent_change(balance, baseline),
                })
            })
            .map_err(sql_err)?;

        let mut board = Vec::new();
        for row in rows {
            board.push(row.map_err(sql_err)?);
        }

        Ok(board)
    }
}
