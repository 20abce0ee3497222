//! Error types for the data layer.
//!
//! [`DbError`] keeps the failure classes callers react to differently apart
//! all the way up to the HTTP edge: a missing entity is never reported as a
//! version conflict, and a cancelled caller is never reported as an expired
//! deadline.

use roster_core::Interrupted;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The target entity does not exist (or has been soft-deleted).
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `"player"`.
        entity: &'static str,
        /// Key the caller asked for.
        id: String,
    },

    /// A conditional write presented a stale version token.
    #[error("{entity} {id} was modified concurrently; refresh and retry")]
    Conflict {
        /// Entity kind.
        entity: &'static str,
        /// Key of the row that was not written.
        id: String,
    },

    /// A unique key is already taken.
    #[error("{entity} with {key} already exists")]
    Duplicate {
        /// Entity kind.
        entity: &'static str,
        /// The offending key value.
        key: String,
    },

    /// Caller-supplied data failed validation before any store access.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No connection could be obtained from the pool.
    #[error("database unavailable: {0}")]
    Resource(#[source] sqlx::Error),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's deadline passed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// Any other driver error, with the operation that hit it.
    #[error("{context}: {source}")]
    Store {
        /// What was being attempted, e.g. `"update player 5"`.
        context: String,
        /// The underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A script file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Build a mapper that wraps a driver error with `context`.
    ///
    /// Pool exhaustion and closed-pool errors become [`DbError::Resource`]
    /// no matter where they surface.
    pub fn store(context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let context = context.into();
        move |source| match source {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Resource(source),
            source => Self::Store { context, source },
        }
    }

    /// A not-found error for `entity` with key `id`.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// A conflict error for `entity` with key `id`.
    pub fn conflict(entity: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether refetching and retrying the same operation can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the driver reported a unique-constraint violation.
    pub(crate) fn is_unique_violation(source: &sqlx::Error) -> bool {
        source
            .as_database_error()
            .is_some_and(|e| e.kind() == sqlx::error::ErrorKind::UniqueViolation)
    }
}

impl From<Interrupted> for DbError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl From<validator::ValidationErrors> for DbError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
