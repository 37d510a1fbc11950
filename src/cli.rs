//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_catalog;
use crate::adapters::file_config::FileConfig;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::error::LedgerError;
use crate::domain::error::TradeError;
use crate::domain::price_walk;
use crate::domain::settings::MarketSettings;
use crate::domain::symbol::assign_symbols;
use crate::domain::trading::{self, TradeReceipt, TradeSide};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "marketledger", about = "Stock price and account ledger over SQLite")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register companies from a catalog and derive their ticker symbols
    Seed {
        #[arg(short, long)]
        config: PathBuf,
        /// Company names, one per line
        #[arg(long)]
        catalog: PathBuf,
        /// Record this opening price for every seeded stock
        #[arg(long)]
        price: Option<f64>,
        #[arg(long, default_value_t = 0)]
        volume: i64,
        /// Write the derived name/symbol pairs to this CSV
        #[arg(long)]
        symbols_out: Option<PathBuf>,
    },
    /// Append one price observation for a ticker
    Record {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 0)]
        volume: i64,
    },
    /// Advance every quoted stock by one random-walk step
    Tick {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register a user account with its opening snapshot
    AddUser {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        /// Opening cash, defaults to starting_cash from the config
        #[arg(long)]
        cash: Option<f64>,
    },
    /// Buy shares at the latest recorded price
    Buy {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        user: i64,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        qty: i64,
    },
    /// Sell shares at the latest recorded price
    Sell {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        user: i64,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        qty: i64,
    },
    /// Show a user's latest snapshot
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        user: i64,
    },
    /// List stocks with their latest price and windowed return
    Stocks {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Rank users by balance
    Leaderboard {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print a stock's recorded prices
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        /// YYYY-MM-DD, defaults to the beginning of history
        #[arg(long, value_parser = parse_cli_date)]
        start: Option<NaiveDate>,
        /// YYYY-MM-DD, defaults to now
        #[arg(long, value_parser = parse_cli_date)]
        end: Option<NaiveDate>,
    },
    /// Print a user's balance history
    Balances {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        user: i64,
        /// YYYY-MM-DD, defaults to the beginning of history
        #[arg(long, value_parser = parse_cli_date)]
        start: Option<NaiveDate>,
        /// YYYY-MM-DD, defaults to now
        #[arg(long, value_parser = parse_cli_date)]
        end: Option<NaiveDate>,
    },
    /// Show the recorded range for a ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Init { config } => run_init(&config),
        Command::Seed {
            config,
            catalog,
            price,
            volume,
            symbols_out,
        } => run_seed(&config, &catalog, price, volume, symbols_out.as_deref()),
        Command::Record {
            config,
            ticker,
            price,
            volume,
        } => run_record(&config, &ticker, price, volume),
        Command::Tick { config } => run_tick(&config),
        Command::AddUser {
            config,
            id,
            name,
            cash,
        } => run_add_user(&config, id, &name, cash),
        Command::Buy {
            config,
            user,
            ticker,
            qty,
        } => run_trade(&config, TradeSide::Buy, user, &ticker, qty),
        Command::Sell {
            config,
            user,
            ticker,
            qty,
        } => run_trade(&config, TradeSide::Sell, user, &ticker, qty),
        Command::Portfolio { config, user } => run_portfolio(&config, user),
        Command::Stocks { config } => run_stocks(&config),
        Command::Leaderboard { config } => run_leaderboard(&config),
        Command::History {
            config,
            ticker,
            start,
            end,
        } => run_history(&config, &ticker, start, end),
        Command::Balances {
            config,
            user,
            start,
            end,
        } => run_balances(&config, user, start, end),
        Command::Info { config, ticker } => run_info(&config, &ticker),
    }
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date {raw:?}, expected YYYY-MM-DD"))
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfig, ExitCode> {
    FileConfig::from_file(path).map_err(|e| {
        let err = LedgerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteStore, LedgerError> {
    let store = SqliteStore::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

/// Clamp an optional date range to timestamps: whole days, endpoints
/// defaulting to the epoch and to `now`.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    now: NaiveDateTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = start
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::UNIX_EPOCH);
    let end = end
        .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999))
        .unwrap_or(now);
    (start, end)
}

/// Read a company catalog, derive symbols and register every stock,
/// optionally recording an opening price.
pub fn seed_catalog(
    store: &dyn StorePort,
    catalog: &Path,
    max_symbol_len: usize,
    price: Option<f64>,
    volume: i64,
    at: NaiveDateTime,
) -> Result<Vec<(String, String)>, LedgerError> {
    let names = csv_catalog::read_company_names(catalog)?;
    let assigned = assign_symbols(&names, max_symbol_len);

    for (name, ticker) in &assigned {
        store.register_stock(name, ticker)?;
        if let Some(price) = price {
            store.record_price(ticker, price, volume, at)?;
        }
    }

    Ok(assigned)
}

/// One random-walk step for every stock with a recorded price. All moves in
/// one step share a timestamp, which the composite history key permits.
pub fn advance_prices<R: Rng + ?Sized>(
    store: &dyn StorePort,
    rng: &mut R,
    at: NaiveDateTime,
    window: chrono::Duration,
) -> Result<Vec<(String, f64)>, LedgerError> {
    let quotes: Vec<(String, f64)> = store
        .list_stocks(at, window)?
        .into_iter()
        .map(|summary| (summary.ticker, summary.price))
        .collect();

    let moved = price_walk::step_all(rng, &quotes);
    for (ticker, price) in &moved {
        store.record_price(ticker, *price, 0, at)?;
    }

    Ok(moved)
}

fn run_init(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match open_store(&config) {
        Ok(_) => {
            eprintln!("Schema initialized");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_seed(
    config_path: &PathBuf,
    catalog: &Path,
    price: Option<f64>,
    volume: i64,
    symbols_out: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match MarketSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let assigned = match seed_catalog(
        &store,
        catalog,
        settings.max_symbol_len,
        price,
        volume,
        now(),
    ) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for (name, ticker) in &assigned {
        println!("{}: {}", ticker, name);
    }

    if let Some(out) = symbols_out {
        if let Err(e) = csv_catalog::write_symbol_catalog(out, &assigned) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Symbol catalog written to {}", out.display());
    }

    eprintln!("{} stocks registered", assigned.len());
    ExitCode::SUCCESS
}

fn run_record(config_path: &PathBuf, ticker: &str, price: f64, volume: i64) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let ticker = ticker.to_uppercase();
    match store.record_price(&ticker, price, volume, now()) {
        Ok(()) => {
            eprintln!("Recorded {} at {:.2}", ticker, price);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_tick(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match MarketSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let moved = match advance_prices(
        &store,
        &mut rand::thread_rng(),
        now(),
        settings.return_window(),
    ) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if moved.is_empty() {
        eprintln!("No stocks with recorded prices");
        return ExitCode::SUCCESS;
    }

    for (ticker, price) in &moved {
        println!("{}: {:.2}", ticker, price);
    }
    eprintln!("{} stocks ticked", moved.len());
    ExitCode::SUCCESS
}

fn run_add_user(config_path: &PathBuf, id: i64, name: &str, cash: Option<f64>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match MarketSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let cash = cash.unwrap_or(settings.starting_cash);
    match store.add_user(id, name, cash, now()) {
        Ok(true) => {
            eprintln!("Added user {} with ID {}", name, id);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("User with ID {} already exists", id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_trade(config_path: &PathBuf, side: TradeSide, user: i64, ticker: &str, qty: i64) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let ticker = ticker.to_uppercase();
    let result = match side {
        TradeSide::Buy => trading::execute_buy(&store, user, &ticker, qty, now()),
        TradeSide::Sell => trading::execute_sell(&store, user, &ticker, qty, now()),
    };

    match result {
        Ok(receipt) => {
            print_receipt(&receipt);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_receipt(receipt: &TradeReceipt) {
    let verb = match receipt.side {
        TradeSide::Buy => "bought",
        TradeSide::Sell => "sold",
    };
    println!(
        "{} {} {} shares of {} at {:.2} for {:.2}",
        receipt.username, verb, receipt.quantity, receipt.ticker, receipt.price, receipt.total
    );
    eprintln!(
        "  cash: {:.2}  balance: {:.2}",
        receipt.cash_after, receipt.balance_after
    );
}

fn run_portfolio(config_path: &PathBuf, user: i64) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match store.latest_snapshot(user) {
        Ok(Some(view)) => {
            println!("{} (ID {})", view.username, view.user_id);
            println!("  cash:    {:.2}", view.cash);
            println!("  balance: {:.2}", view.balance);
            if view.holdings.is_empty() {
                println!("  holdings: none");
            } else {
                for (ticker, lot) in view.holdings.iter() {
                    println!(
                        "  {}: {} shares, avg {:.2}",
                        ticker, lot.quantity, lot.average_price
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            let e = LedgerError::from(TradeError::UnknownUser { user_id: user });
            eprintln!("error: {e}");
            (&e).into()
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_stocks(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match MarketSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match store.list_stocks(now(), settings.return_window()) {
        Ok(summaries) => {
            if summaries.is_empty() {
                eprintln!("No stocks recorded");
                return ExitCode::SUCCESS;
            }
            for s in &summaries {
                println!("{}  {:.2}  {:+.2}%  {}", s.ticker, s.price, s.return_pct, s.name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_leaderboard(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match MarketSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match store.leaderboard(now(), settings.return_window()) {
        Ok(board) => {
            if board.is_empty() {
                eprintln!("No users recorded");
                return ExitCode::SUCCESS;
            }
            for (rank, row) in board.iter().enumerate() {
                println!(
                    "{}. {}  {:.2}  {:+.2}%",
                    rank + 1,
                    row.username,
                    row.balance,
                    row.return_pct
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_history(
    config_path: &PathBuf,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let ticker = ticker.to_uppercase();
    let (start, end) = resolve_range(start, end, now());
    match store.price_history(&ticker, start, end) {
        Ok(points) => {
            if points.is_empty() {
                eprintln!("No recorded prices for {}", ticker);
                return ExitCode::SUCCESS;
            }
            for p in &points {
                println!("{}  {:.2}  {}", p.at, p.price, p.volume);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_balances(
    config_path: &PathBuf,
    user: i64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let (start, end) = resolve_range(start, end, now());
    match store.balance_history(user, start, end) {
        Ok(points) => {
            if points.is_empty() {
                eprintln!("No history for user {}", user);
                return ExitCode::SUCCESS;
            }
            for p in &points {
                println!("{}  balance {:.2}  cash {:.2}", p.at, p.balance, p.cash);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(config_path: &PathBuf, ticker: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let ticker = ticker.to_uppercase();
    match store.price_range(&ticker) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} rows, {} to {}", ticker, count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", ticker);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
