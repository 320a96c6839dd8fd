//! Common error types for tagrec

use thiserror::Error;

/// Common result type for tagrec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tagrec crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/tagrec/config.toml")?)
        }
        assert!(matches!(open_missing(), Err(Error::Io(_))));
    }

    #[test]
    fn test_config_error_message() {
        let err = Error::Config("LLM API key not configured".to_string());
        assert_eq!(err.to_string(), "Configuration error: LLM API key not configured");
    }
}
