//! Configuration access port trait.

use crate::domain::error::LedgerError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Like `get_string`, but absence or a blank value is an error.
    fn require_string(&self, section: &str, key: &str) -> Result<String, LedgerError> {
        match self.get_string(section, key) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(LedgerError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            }),
        }
    }
}
