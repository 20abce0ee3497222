//! Shared type definitions for the Roster service.
//!
//! This crate defines the ids, entities, input structs and version tokens
//! used by every other crate in the workspace. It has no I/O and no async
//! code.
//!
//! # Modules
//!
//! - [`ids`] -- Strongly-typed `i64` identifiers
//! - [`structs`] -- Entities, validated inputs, paging
//! - [`version`] -- Optimistic-concurrency version tokens

pub mod ids;
pub mod structs;
pub mod version;

// Re-export primary types for convenience.
pub use ids::{ClientId, ContactId, PlayerId, PrincipalId};
pub use structs::{
    Audit, Client, ClientChanges, Contact, NewClient, NewContact, NewPlayer, Paging, Player,
    PlayerChanges, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use version::{VersionToken, VersionTokenError};
