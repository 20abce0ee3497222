//! Startup SQL script loader.
//!
//! Runs a whole script file in one transaction under the system principal,
//! so seeded rows are attributed to the process rather than to a user.

use std::path::Path;

use futures::FutureExt as _;
use roster_core::RequestContext;

use crate::error::DbError;
use crate::executor::TransactionalExecutor;

/// Executes SQL script files through a [`TransactionalExecutor`].
pub struct ScriptLoader {
    executor: TransactionalExecutor,
}

impl ScriptLoader {
    /// Create a loader that runs scripts through `executor`.
    pub const fn new(executor: TransactionalExecutor) -> Self {
        Self { executor }
    }

    /// Run the script at `path`. A missing file is skipped.
    ///
    /// Returns whether a script was run. The transaction honours `ctx`'s
    /// cancellation and deadline, but always runs as the system principal.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file exists but cannot be read, and
    /// any store error from the script; the script's effects are then rolled
    /// back in full.
    pub async fn load(&self, ctx: &RequestContext, path: &Path) -> Result<bool, DbError> {
        let script = match tokio::fs::read_to_string(path).await {
            Ok(script) => script,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no startup script, skipping");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), "Running startup script");
        let system = ctx.child().with_principal(roster_types::PrincipalId::SYSTEM);
        let context = format!("run script {}", path.display());
        self.executor
            .run(&system, move |conn| {
                async move {
                    sqlx::Executor::execute(conn, sqlx::raw_sql(&script))
                        .await
                        .map_err(DbError::store(context))?;
                    Ok::<(), DbError>(())
                }
                .boxed()
            })
            .await?;
        tracing::info!(path = %path.display(), "Startup script completed");
        Ok(true)
    }
}
