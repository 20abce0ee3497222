//! Roster service binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `roster-config.yaml` (or `ROSTER_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the PostgreSQL pool and run migrations
//! 4. Run the per-environment startup script as the system principal
//! 5. Build caches, services and the bulk importer
//! 6. Register and start background services
//! 7. Serve HTTP until `SIGINT` or `SIGTERM`
//!
//! Shutdown runs in reverse: the listener drains, in-flight requests are
//! cancelled through their context, background services are stopped and
//! awaited, caches are cleared and the pool is closed.

mod error;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use roster_api::{AppState, ServerConfig};
use roster_core::{ReadCache, RequestContext, RosterConfig, ServiceRegistry};
use roster_db::{PostgresConfig, PostgresPool, ScriptLoader};
use roster_services::{
    ClientImporter, ClientService, ContactService, PlayerService, client_scheduler,
    contact_scheduler,
};
use roster_types::{Client, ClientId, Player, PlayerId};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "roster-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails or the server stops abnormally.
#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config_path = std::env::var("ROSTER_CONFIG")
        .map_or_else(|_| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = RosterConfig::load(&config_path)?;

    init_logging(&config)?;
    info!(
        env = config.app.env.as_str(),
        host = config.app.host,
        port = config.app.port,
        max_connections = config.database.max_connections,
        workers = config.pool.workers,
        "roster-server starting"
    );

    let pool = PostgresPool::connect(&PostgresConfig::from(&config.database)).await?;
    pool.run_migrations().await?;

    let executor = pool.executor();
    if let Some(script) = config.database.script_path(config.app.env) {
        let loaded = ScriptLoader::new(executor.clone())
            .load(&RequestContext::system(), &script)
            .await?;
        if loaded {
            info!(path = %script.display(), "startup script applied");
        }
    }

    let player_cache: ReadCache<PlayerId, Player> =
        ReadCache::new("players", config.cache.max_cost);
    let client_cache: ReadCache<ClientId, Client> =
        ReadCache::new("clients", config.cache.max_cost);

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        players: PlayerService::new(
            executor.clone(),
            player_cache.clone(),
            config.cache.player_ttl(),
        ),
        clients: ClientService::new(
            executor.clone(),
            client_cache.clone(),
            config.cache.client_ttl(),
        ),
        contacts: ContactService::new(executor.clone()),
        importer: ClientImporter::new(
            executor.clone(),
            config.pool.workers,
            config.pool.queue_capacity,
        ),
        executor: executor.clone(),
        request_timeout: config.app.request_timeout(),
        shutdown: shutdown.clone(),
    });

    let registry = ServiceRegistry::new();
    registry.register(Arc::new(client_scheduler(
        executor.clone(),
        config.scheduler.client_interval(),
    )))?;
    registry.register(Arc::new(contact_scheduler(
        executor,
        config.scheduler.contact_interval(),
    )))?;
    registry.start_all().await;

    tokio::spawn(signals::cancel_on(
        signals::shutdown_signal(),
        shutdown.clone(),
    ));

    let server = ServerConfig {
        host: config.app.host.clone(),
        port: config.app.port,
    };
    let served = roster_api::serve(&server, state, shutdown.clone()).await;

    // Reached on signal or on a server failure; either way wind everything down.
    shutdown.cancel();
    registry.stop_all().await;
    registry.deregister_all();
    player_cache.clear();
    client_cache.clear();
    pool.close().await;
    info!("roster-server stopped");

    served.map_err(StartupError::from)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &RosterConfig) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| StartupError::Logging {
        message: e.to_string(),
    })
}
