//! HTTP edge for the Roster service.
//!
//! Exposes players and clients over REST. Every request runs under a
//! [`RequestContext`](roster_core::RequestContext) built by the
//! [`Caller`](extract::Caller) extractor, so the principal header, the
//! request deadline and server shutdown all reach the data layer.
//!
//! Optimistic concurrency surfaces as HTTP preconditions: reads carry the
//! entity's version as a weak `ETag`, and updates, deletes and check-ins
//! require it back in `If-Match`. A stale tag yields `412 Precondition
//! Failed`; a missing entity yields `404 Not Found`.

pub mod error;
pub mod etag;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve};
pub use state::AppState;
