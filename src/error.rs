//! Error types for the analytics pipeline

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the analytics pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Input errors
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Wallet not tracked: {0}")]
    WalletNotFound(String),

    // Provider errors
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider rate limited (retry after {retry_after_secs}s)")]
    ProviderRateLimited { retry_after_secs: u64 },

    #[error("Provider timeout after {0}ms")]
    ProviderTimeout(u64),

    #[error("Malformed provider payload: {0}")]
    ProviderMalformed(String),

    // Store errors
    #[error("Store conflict: {0}")]
    StoreConflict(String),

    #[error("Store corrupt: {0}")]
    StoreCorrupt(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Run control
    #[error("Sync cancelled")]
    Cancelled,

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ProviderUnavailable(_)
                | Error::ProviderRateLimited { .. }
                | Error::ProviderTimeout(_)
        )
    }

    /// Check if this error is fatal to the in-flight store operation
    pub fn is_store_fatal(&self) -> bool {
        matches!(self, Error::StoreConflict(_) | Error::StoreCorrupt(_))
    }
}

// Conversion from rusqlite errors: constraint violations are conflicts,
// everything else is treated as corruption of the in-flight operation.
impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::StoreConflict(e.to_string())
            }
            _ => Error::StoreCorrupt(e.to_string()),
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::ProviderTimeout(0)
        } else if e.is_decode() {
            Error::ProviderMalformed(e.to_string())
        } else {
            Error::ProviderUnavailable(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::ProviderUnavailable("503".into()).is_retryable());
        assert!(Error::ProviderRateLimited { retry_after_secs: 6 }.is_retryable());
        assert!(Error::ProviderTimeout(5000).is_retryable());
        assert!(!Error::InvalidAddress("xyz".into()).is_retryable());
        assert!(!Error::StoreCorrupt("page fault".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_store_fatal_classification() {
        assert!(Error::StoreConflict("unique".into()).is_store_fatal());
        assert!(Error::StoreCorrupt("disk".into()).is_store_fatal());
        assert!(!Error::ProviderTimeout(100).is_store_fatal());
    }
}
