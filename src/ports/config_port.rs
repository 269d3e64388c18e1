//! Configuration access port trait.

use crate::domain::error::TraderError;

/// Raw key/value access; typed getters parse on top of [`get_string`](Self::get_string).
/// A missing key yields the default; a present but malformed value is an error.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, TraderError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                TraderError::invalid(section, key, format!("'{}' is not a number", raw))
            }),
        }
    }

    fn get_uint(&self, section: &str, key: &str, default: usize) -> Result<usize, TraderError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                TraderError::invalid(section, key, format!("'{}' is not a non-negative integer", raw))
            }),
        }
    }
}
