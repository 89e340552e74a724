//! Error types.
//!
//! - `MatchError` is what the library (stores, fitter, mapper, exports) returns.
//! - `AppError` is what the binary returns; it carries the process exit code.

/// Library-level failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    /// A precondition on the inputs was violated (table shape, empty common
    /// domain, missing fit outcome, ...). Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A table could not be supplied by the store.
    #[error("Failed to load data from {table}: {message}")]
    DataAccess { table: String, message: String },
}

impl MatchError {
    pub fn config(message: impl Into<String>) -> Self {
        MatchError::Configuration(message.into())
    }

    pub fn data_access(table: impl Into<String>, message: impl Into<String>) -> Self {
        MatchError::DataAccess {
            table: table.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        let exit_code = match err {
            MatchError::DataAccess { .. } => 2,
            MatchError::Configuration(_) => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_errors_map_to_exit_codes() {
        let access: AppError = MatchError::data_access("train.csv", "missing").into();
        assert_eq!(access.exit_code(), 2);
        assert_eq!(access.to_string(), "Failed to load data from train.csv: missing");

        let config: AppError = MatchError::config("empty common domain").into();
        assert_eq!(config.exit_code(), 3);
        assert_eq!(config.to_string(), "Configuration error: empty common domain");
    }
}
