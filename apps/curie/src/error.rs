//! CLI error handling

use std::fmt;

use curie_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(curie_errors::ConfigError),
    /// Cache or network error
    Ops(curie_errors::Error),
    /// Some keys of a batch could not be resolved
    Incomplete { failed: usize, total: usize },
    /// The key is not in the cache
    NotCached(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Incomplete { failed, total } => {
                write!(f, "{failed} of {total} products could not be fetched")
            }
            CliError::NotCached(key) => write!(f, "{key} is not cached"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<curie_errors::ConfigError> for CliError {
    fn from(e: curie_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<curie_errors::Error> for CliError {
    fn from(e: curie_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
