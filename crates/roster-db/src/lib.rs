//! `PostgreSQL` data layer for the Roster service.
//!
//! Every store access goes through [`TransactionalExecutor::run`], which
//! binds the caller's principal into session state, runs the unit of work in
//! a `READ COMMITTED` transaction and commits or rolls back as a whole.
//! Repositories borrow the transaction's connection and implement the
//! version-token conditional writes.
//!
//! # Architecture
//!
//! ```text
//! Caller (RequestContext)
//!     |
//!     +-- TransactionalExecutor::run
//!         |-- SessionConnection   (acquire, bind principal, reset)
//!         |-- Transaction         (READ COMMITTED, commit / rollback)
//!         +-- unit of work
//!             |-- PlayerRepo      (player_entity)
//!             |-- ClientRepo      (client_entity)
//!             +-- ContactRepo     (contact_entity)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`executor`] -- Transaction-scoped unit-of-work runner
//! - [`session`] -- Principal binding on pooled connections
//! - [`guard`] -- Conflict vs not-found resolution for conditional writes
//! - [`player_repo`] -- Player queries and conditional writes
//! - [`client_repo`] -- Client queries and conditional writes
//! - [`contact_repo`] -- Contact reads and inserts
//! - [`loader`] -- Startup SQL script loader
//! - [`error`] -- Shared error types

pub mod client_repo;
pub mod contact_repo;
pub mod error;
pub mod executor;
pub mod guard;
pub mod loader;
pub mod player_repo;
pub mod postgres;
pub mod session;

// Re-export primary types for convenience.
pub use client_repo::ClientRepo;
pub use contact_repo::ContactRepo;
pub use error::DbError;
pub use executor::TransactionalExecutor;
pub use loader::ScriptLoader;
pub use player_repo::PlayerRepo;
pub use postgres::{PostgresConfig, PostgresPool};
pub use session::{SessionConnection, current_principal};
