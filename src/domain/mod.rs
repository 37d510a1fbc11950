//! Core domain types and logic.

pub mod account;
pub mod error;
pub mod holdings;
pub mod instrument;
pub mod price_walk;
pub mod settings;
pub mod symbol;
pub mod trading;
