//! Seatwatch error types
//!
//! Writes to the officeholder store fail hard (the whole transaction rolls
//! back). Everything on the live overlay path is soft: callers receive an
//! explicit degraded outcome and keep the static snapshot.

use thiserror::Error;

/// Error category for structured logging and behavior mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// `seatwatch.toml` or env misconfigured
    ConfigError,
    /// Errors opening/querying the officeholder SQLite store
    StoreError,
    /// Rejected writes: invalid enum, referential integrity, duplicate current term
    ConstraintError,
    /// Failures talking to the live election source
    LiveFetchError,
    /// Overlay cache storage failures
    CacheError,
    /// Unexpected logic bugs
    InternalError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::StoreError => "STORE_ERROR",
            Self::ConstraintError => "CONSTRAINT_ERROR",
            Self::LiveFetchError => "LIVE_FETCH_ERROR",
            Self::CacheError => "CACHE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether a page render can still proceed from the static snapshot
    pub fn overlay_recoverable(&self) -> bool {
        matches!(self, Self::LiveFetchError | Self::CacheError)
    }
}

/// Seatwatch error with category and context
#[derive(Debug, Error)]
pub enum SeatwatchError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("constraint violation: {message}")]
    Constraint {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("live fetch error: {message}")]
    LiveFetch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SeatwatchError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::ConfigError,
            Self::Store { .. } => ErrorCategory::StoreError,
            Self::Constraint { .. } => ErrorCategory::ConstraintError,
            Self::LiveFetch { .. } => ErrorCategory::LiveFetchError,
            Self::Cache { .. } => ErrorCategory::CacheError,
            Self::Internal { .. } => ErrorCategory::InternalError,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap a rusqlite failure, classifying SQLite constraint failures
    /// (CHECK, FOREIGN KEY, UNIQUE) as [`SeatwatchError::Constraint`].
    pub fn from_sqlite(message: impl Into<String>, err: rusqlite::Error) -> Self {
        let message = message.into();
        let is_constraint = matches!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
        if is_constraint {
            Self::Constraint {
                message,
                source: Some(Box::new(err)),
            }
        } else {
            Self::Store {
                message,
                source: Some(Box::new(err)),
            }
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
            source: None,
        }
    }

    pub fn live_fetch(message: impl Into<String>) -> Self {
        Self::LiveFetch {
            message: message.into(),
            source: None,
        }
    }

    pub fn live_fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::LiveFetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    pub fn cache_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Cache {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for seatwatch operations
pub type Result<T> = std::result::Result<T, SeatwatchError>;
