//! Bulk client import.
//!
//! Rows are validated up front; a single bad row rejects the whole batch
//! before anything is written. Valid batches are fanned out through a
//! [`TaskPool`], one transaction per row. The first failing row cancels the
//! rest of the batch. Rows already committed stay committed, and the
//! report says how many there were.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt as _;
use roster_core::{RequestContext, TaskPool};
use roster_db::{ClientRepo, DbError, TransactionalExecutor};
use roster_types::NewClient;
use validator::Validate as _;

/// Why an import stopped.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A row failed validation; nothing was written.
    #[error("row {row} is invalid: {source}")]
    InvalidRow {
        /// Zero-based index of the first bad row.
        row: usize,
        /// The validation failure.
        source: DbError,
    },

    /// A row failed in the store and the remaining rows were cancelled.
    #[error("import stopped after {committed} rows: {source}")]
    Failed {
        /// Rows committed before the failure was observed.
        committed: usize,
        /// The first failure.
        source: DbError,
    },
}

/// Outcome of a completed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows written.
    pub imported: usize,
}

/// Imports batches of clients concurrently.
#[derive(Clone)]
pub struct ClientImporter {
    executor: TransactionalExecutor,
    workers: usize,
    queue_capacity: usize,
}

impl ClientImporter {
    /// Create an importer running up to `workers` rows at once.
    pub const fn new(executor: TransactionalExecutor, workers: usize, queue_capacity: usize) -> Self {
        Self {
            executor,
            workers,
            queue_capacity,
        }
    }

    /// Validate and insert `rows` on behalf of `ctx`'s principal.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidRow`] without touching the store if any
    /// row is malformed, and [`ImportError::Failed`] with the first store
    /// error (or the caller's cancellation) otherwise.
    pub async fn import(
        &self,
        ctx: &RequestContext,
        rows: Vec<NewClient>,
    ) -> Result<ImportReport, ImportError> {
        if let Some((row, errors)) = rows
            .iter()
            .enumerate()
            .find_map(|(i, r)| r.validate().err().map(|e| (i, e)))
        {
            return Err(ImportError::InvalidRow {
                row,
                source: errors.into(),
            });
        }

        let total = rows.len();
        let committed = Arc::new(AtomicUsize::new(0));
        let mut pool: TaskPool<DbError> =
            TaskPool::with_parent(self.workers, self.queue_capacity, ctx.cancellation());

        for row in rows {
            let executor = self.executor.clone();
            let committed = Arc::clone(&committed);
            let base = ctx.clone();
            let submitted = pool
                .submit(move |token| async move {
                    let task_ctx = base.with_cancellation(token);
                    executor
                        .run(&task_ctx, move |conn| {
                            async move { ClientRepo::new(conn).create(&row).await }.boxed()
                        })
                        .await?;
                    committed.fetch_add(1, Ordering::Relaxed);
                    Ok::<(), DbError>(())
                })
                .await;
            if let Err(e) = submitted {
                tracing::debug!(error = %e, "import pool stopped accepting rows");
                break;
            }
        }

        let outcome = pool.wait().await;
        let committed = committed.load(Ordering::Relaxed);
        let failure = match outcome {
            Err(e) => Some(e),
            Ok(()) => ctx.check().err().map(DbError::from),
        };

        if let Some(source) = failure {
            tracing::warn!(committed, total, error = %source, "Client import stopped");
            return Err(ImportError::Failed { committed, source });
        }
        tracing::info!(imported = committed, "Client import completed");
        Ok(ImportReport { imported: committed })
    }
}
