//! Concrete adapter implementations for ports.

pub mod csv_catalog;
pub mod file_config;
pub mod sqlite_store;
