//! Error types for the Roster binary.

/// Top-level error for startup and serving.
///
/// Each variant wraps one subsystem's error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: roster_core::ConfigError,
    },

    /// Connecting, migrating or seeding the database failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying store error.
        #[from]
        source: roster_db::DbError,
    },

    /// A background service could not be registered.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: roster_core::RegistryError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: roster_api::ServerError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
