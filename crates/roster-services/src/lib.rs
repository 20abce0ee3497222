//! Use cases for the Roster service.
//!
//! Services combine the read cache, the transactional executor and the
//! version-guarded repositories. Callers pass a [`RequestContext`] carrying
//! the principal, cancellation signal and deadline.
//!
//! # Modules
//!
//! - [`player`] -- Player reads (short-TTL cache) and conditional writes
//! - [`client`] -- Client reads (read-through cache) and conditional writes
//! - [`contact`] -- Contact reads and inserts, always from the store
//! - [`import`] -- Bulk client import fanned out through a task pool
//! - [`scheduler`] -- Periodic client and contact summaries as registry services
//!
//! [`RequestContext`]: roster_core::RequestContext

pub mod client;
pub mod contact;
pub mod import;
pub mod player;
pub mod scheduler;

pub use client::ClientService;
pub use contact::ContactService;
pub use import::{ClientImporter, ImportError, ImportReport};
pub use player::PlayerService;
pub use scheduler::{CLIENT_SCHEDULER, CONTACT_SCHEDULER, client_scheduler, contact_scheduler};
