//! Shared application state for the HTTP edge.

use std::time::Duration;

use roster_db::TransactionalExecutor;
use roster_services::{ClientImporter, ClientService, ContactService, PlayerService};
use tokio_util::sync::CancellationToken;

/// Services and request policy shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Player use cases.
    pub players: PlayerService,
    /// Client use cases.
    pub clients: ClientService,
    /// Contact lookups.
    pub contacts: ContactService,
    /// Bulk client import.
    pub importer: ClientImporter,
    /// Direct executor access for session introspection.
    pub executor: TransactionalExecutor,
    /// Deadline attached to every request, if any.
    pub request_timeout: Option<Duration>,
    /// Fired at shutdown; every request context derives from it.
    pub shutdown: CancellationToken,
}
