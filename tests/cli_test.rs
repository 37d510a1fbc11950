//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config loading from INI files on disk
//! - Date range resolution defaults
//! - Catalog seeding: symbol derivation, registration, opening prices
//! - Random-walk ticks against a seeded in-memory store
//! - Full command dispatch against a file-backed database

mod common;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::*;
use marketledger::adapters::file_config::FileConfig;
use marketledger::adapters::sqlite_store::SqliteStore;
use marketledger::cli::{self, Cli, Command};
use marketledger::ports::config_port::ConfigPort;
use marketledger::ports::store_port::StorePort;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::PathBuf;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ExitCode doesn't implement PartialEq, so compare Debug renderings.
fn assert_exit(code: std::process::ExitCode, expected: u8) {
    assert_eq!(
        format!("{code:?}"),
        format!("{:?}", std::process::ExitCode::from(expected))
    );
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_the_file() {
        let file = write_temp_ini("[sqlite]\npath = /tmp/ledger.db\n");
        let path = PathBuf::from(file.path());

        let config = cli::load_config(&path).unwrap();

        assert_eq!(
            config.get_string("sqlite", "path"),
            Some("/tmp/ledger.db".to_string())
        );
    }

    #[test]
    fn load_config_missing_file_fails_with_config_code() {
        let path = PathBuf::from("/nonexistent/path/config.ini");

        let code = cli::load_config(&path).unwrap_err();

        assert_exit(code, 2);
    }
}

mod range_resolution {
    use super::*;

    #[test]
    fn defaults_span_epoch_to_now() {
        let now = ts("2024-06-10T12:00:00");

        let (start, end) = cli::resolve_range(None, None, now);

        assert_eq!(start, NaiveDateTime::UNIX_EPOCH);
        assert_eq!(end, now);
    }

    #[test]
    fn explicit_dates_cover_whole_days() {
        let now = ts("2024-06-10T12:00:00");
        let start_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end_date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

        let (start, end) = cli::resolve_range(Some(start_date), Some(end_date), now);

        assert_eq!(start, ts("2024-06-01T00:00:00"));
        assert_eq!(
            end,
            end_date.and_hms_micro_opt(23, 59, 59, 999_999).unwrap()
        );
    }
}

mod seeding {
    use super::*;

    #[test]
    fn seed_registers_each_company_with_a_derived_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("companies.txt");
        std::fs::write(&catalog, "Acme Corp\nBirch Industries\n").unwrap();
        let store = MockStore::new();

        let assigned =
            cli::seed_catalog(&store, &catalog, 5, None, 0, ts("2024-06-01T09:00:00")).unwrap();

        assert_eq!(
            assigned,
            vec![
                ("Acme Corp".to_string(), "A".to_string()),
                ("Birch Industries".to_string(), "B".to_string()),
            ]
        );
        let stock = store.stock_by_ticker("A").unwrap().unwrap();
        assert_eq!(stock.name, "Acme Corp");
        // No opening price was requested.
        assert_eq!(store.latest_price("A").unwrap(), None);
    }

    #[test]
    fn seed_records_an_opening_price_when_given() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("companies.txt");
        std::fs::write(&catalog, "Acme Corp\nBirch Industries\n").unwrap();
        let store = MockStore::new();

        cli::seed_catalog(&store, &catalog, 5, Some(25.0), 0, ts("2024-06-01T09:00:00")).unwrap();

        assert_eq!(store.latest_price("A").unwrap(), Some(25.0));
        assert_eq!(store.latest_price("B").unwrap(), Some(25.0));
    }

    #[test]
    fn reseeding_the_same_catalog_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("companies.txt");
        std::fs::write(&catalog, "Acme Corp\nBirch Industries\n").unwrap();
        let store = MockStore::new();

        let first =
            cli::seed_catalog(&store, &catalog, 5, Some(50.0), 0, ts("2024-06-01T09:00:00"))
                .unwrap();
        let second =
            cli::seed_catalog(&store, &catalog, 5, None, 0, ts("2024-06-02T09:00:00")).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.latest_price("A").unwrap(), Some(50.0));
    }

    #[test]
    fn seed_surfaces_a_missing_catalog() {
        let store = MockStore::new();

        let err = cli::seed_catalog(
            &store,
            std::path::Path::new("/nonexistent/companies.txt"),
            5,
            None,
            0,
            ts("2024-06-01T09:00:00"),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            marketledger::domain::error::LedgerError::Catalog { .. }
        ));
    }
}

mod ticking {
    use super::*;

    fn quoted_market() -> MockStore {
        MockStore::new()
            .with_stock("ACME", "Acme Corp")
            .with_stock("BIR", "Birch Industries")
            .with_price("ACME", 50.0, ts("2024-06-01T09:00:00"))
            .with_price("BIR", 20.0, ts("2024-06-01T09:00:00"))
    }

    #[test]
    fn tick_moves_every_quoted_stock() {
        let store = quoted_market();
        let mut rng = StdRng::seed_from_u64(7);
        let at = ts("2024-06-01T10:00:00");

        let moved = cli::advance_prices(&store, &mut rng, at, Duration::hours(24)).unwrap();

        assert_eq!(moved.len(), 2);
        let tickers: Vec<&str> = moved.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tickers, ["ACME", "BIR"]);
        for (ticker, price) in &moved {
            assert!(*price >= 0.01);
            let prior = if ticker == "ACME" { 50.0 } else { 20.0 };
            assert!(*price > prior * 0.5 && *price < prior * 2.0);
            assert_eq!(store.latest_price(ticker).unwrap(), Some(*price));
        }
    }

    #[test]
    fn tick_records_every_move_at_one_timestamp() {
        let store = quoted_market();
        let mut rng = StdRng::seed_from_u64(7);
        let at = ts("2024-06-01T10:00:00");

        cli::advance_prices(&store, &mut rng, at, Duration::hours(24)).unwrap();

        for ticker in ["ACME", "BIR"] {
            let history = store
                .price_history(ticker, at, at)
                .unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].at, at);
        }
    }

    #[test]
    fn tick_is_deterministic_for_a_seed() {
        let first = {
            let store = quoted_market();
            let mut rng = StdRng::seed_from_u64(99);
            cli::advance_prices(&store, &mut rng, ts("2024-06-01T10:00:00"), Duration::hours(24))
                .unwrap()
        };
        let second = {
            let store = quoted_market();
            let mut rng = StdRng::seed_from_u64(99);
            cli::advance_prices(&store, &mut rng, ts("2024-06-01T10:00:00"), Duration::hours(24))
                .unwrap()
        };

        assert_eq!(first, second);
    }

    #[test]
    fn tick_with_no_quotes_moves_nothing() {
        let store = MockStore::new().with_stock("ACME", "Acme Corp");
        let mut rng = StdRng::seed_from_u64(7);

        let moved = cli::advance_prices(
            &store,
            &mut rng,
            ts("2024-06-01T10:00:00"),
            Duration::hours(24),
        )
        .unwrap();

        assert!(moved.is_empty());
    }
}

mod full_dispatch {
    use super::*;

    #[test]
    fn init_seed_and_trade_through_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.db");
        let catalog = dir.path().join("companies.txt");
        let symbols_out = dir.path().join("symbols.csv");
        std::fs::write(&catalog, "Acme Corp\n").unwrap();
        let ini = format!(
            "[sqlite]\npath = {}\n\n[market]\nstarting_cash = 1000.0\n",
            db.display()
        );
        let config = dir.path().join("ledger.ini");
        std::fs::write(&config, &ini).unwrap();

        let code = cli::run(Cli {
            command: Command::Init {
                config: config.clone(),
            },
        });
        assert_exit(code, 0);

        let code = cli::run(Cli {
            command: Command::Seed {
                config: config.clone(),
                catalog: catalog.clone(),
                price: Some(50.0),
                volume: 0,
                symbols_out: Some(symbols_out.clone()),
            },
        });
        assert_exit(code, 0);
        let written = std::fs::read_to_string(&symbols_out).unwrap();
        assert!(written.starts_with("Company Name,Ticker"));
        assert!(written.contains("Acme Corp,A"));

        let code = cli::run(Cli {
            command: Command::AddUser {
                config: config.clone(),
                id: 1,
                name: "alice".to_string(),
                cash: None,
            },
        });
        assert_exit(code, 0);

        let code = cli::run(Cli {
            command: Command::Buy {
                config: config.clone(),
                user: 1,
                ticker: "a".to_string(),
                qty: 4,
            },
        });
        assert_exit(code, 0);

        for command in [
            Command::Portfolio {
                config: config.clone(),
                user: 1,
            },
            Command::Stocks {
                config: config.clone(),
            },
            Command::Leaderboard {
                config: config.clone(),
            },
            Command::History {
                config: config.clone(),
                ticker: "A".to_string(),
                start: None,
                end: None,
            },
            Command::Balances {
                config: config.clone(),
                user: 1,
                start: None,
                end: None,
            },
            Command::Info {
                config: config.clone(),
                ticker: "A".to_string(),
            },
        ] {
            assert_exit(cli::run(Cli { command }), 0);
        }

        // Reopen the database directly and check the resulting account.
        let file_config = FileConfig::from_string(&ini).unwrap();
        let store = SqliteStore::from_config(&file_config).unwrap();
        let view = store.latest_snapshot(1).unwrap().unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.holdings.quantity_of("A"), 4);
        assert!((view.cash - 800.0).abs() < f64::EPSILON);
        assert!((view.balance - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejected_buy_exits_with_the_trade_code() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.db");
        let catalog = dir.path().join("companies.txt");
        std::fs::write(&catalog, "Acme Corp\n").unwrap();
        let config = dir.path().join("ledger.ini");
        std::fs::write(
            &config,
            format!(
                "[sqlite]\npath = {}\n\n[market]\nstarting_cash = 100.0\n",
                db.display()
            ),
        )
        .unwrap();

        assert_exit(
            cli::run(Cli {
                command: Command::Seed {
                    config: config.clone(),
                    catalog,
                    price: Some(50.0),
                    volume: 0,
                    symbols_out: None,
                },
            }),
            0,
        );
        assert_exit(
            cli::run(Cli {
                command: Command::AddUser {
                    config: config.clone(),
                    id: 1,
                    name: "alice".to_string(),
                    cash: None,
                },
            }),
            0,
        );

        // 10 shares at 50.0 against 100.0 of cash.
        let code = cli::run(Cli {
            command: Command::Buy {
                config,
                user: 1,
                ticker: "A".to_string(),
                qty: 10,
            },
        });
        assert_exit(code, 5);
    }

    #[test]
    fn portfolio_for_an_unknown_user_exits_with_the_trade_code() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.db");
        let config = dir.path().join("ledger.ini");
        std::fs::write(&config, format!("[sqlite]\npath = {}\n", db.display())).unwrap();

        assert_exit(
            cli::run(Cli {
                command: Command::Init {
                    config: config.clone(),
                },
            }),
            0,
        );

        let code = cli::run(Cli {
            command: Command::Portfolio { config, user: 99 },
        });
        assert_exit(code, 5);
    }

    #[test]
    fn missing_config_file_exits_with_the_config_code() {
        let code = cli::run(Cli {
            command: Command::Init {
                config: PathBuf::from("/nonexistent/ledger.ini"),
            },
        });
        assert_exit(code, 2);
    }
}
