//! Concurrency primitives, caching and configuration for the Roster service.
//!
//! Nothing in this crate touches the database. The store-facing crates build
//! on these pieces.
//!
//! # Modules
//!
//! - [`cache`] -- Bounded, cost-weighted read cache with per-entry TTL.
//! - [`clock`] -- Injectable monotonic clock for expiry decisions.
//! - [`config`] -- Configuration loading from `roster-config.yaml`.
//! - [`context`] -- Ambient per-operation context: principal, cancellation, deadline.
//! - [`pool`] -- Bounded worker pool with first-error cancellation.
//! - [`registry`] -- [`Service`] trait and [`ServiceRegistry`].
//! - [`ticker`] -- Periodic background loop as a [`Service`].
//!
//! [`Service`]: registry::Service
//! [`ServiceRegistry`]: registry::ServiceRegistry

pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod pool;
pub mod registry;
pub mod ticker;

pub use cache::ReadCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, Environment, RosterConfig};
pub use context::{Interrupted, RequestContext};
pub use pool::{PoolError, PoolState, TaskPool};
pub use registry::{RegistryError, Service, ServiceRegistry};
pub use ticker::TickerService;
