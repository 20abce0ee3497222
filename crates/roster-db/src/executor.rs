//! Transaction-scoped unit-of-work runner.
//!
//! [`TransactionalExecutor::run`] is the only way the service touches the
//! store. Each call:
//!
//! 1. acquires one pooled connection and binds the caller's principal
//!    ([`SessionConnection`]),
//! 2. begins a `READ COMMITTED` transaction,
//! 3. runs the unit of work on the transaction's connection,
//! 4. commits on success; rolls back on error, interruption or panic
//!    (a panic is re-raised after the rollback),
//! 5. clears the session principal and returns the connection.
//!
//! No timeout is imposed here. The [`RequestContext`] deadline and
//! cancellation signal apply while acquiring, beginning and running the
//! unit of work. Commit and rollback always run to completion so the
//! reported outcome matches what the store did.

use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use roster_core::RequestContext;
use sqlx::{Connection as _, PgConnection, PgPool, Postgres, Transaction};

use crate::error::DbError;
use crate::session::SessionConnection;

/// Executes units of work inside pooled, principal-scoped transactions.
#[derive(Clone, Debug)]
pub struct TransactionalExecutor {
    pool: PgPool,
}

impl TransactionalExecutor {
    /// Create an executor over `pool`.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The pool connections are drawn from.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `work` in a fresh transaction on behalf of `ctx`'s principal.
    ///
    /// `work` receives the transaction's connection. Move any owned inputs
    /// into the closure and return a boxed future borrowing only the
    /// connection.
    ///
    /// # Errors
    ///
    /// - [`DbError::Resource`] if no connection is available; `work` is not called.
    /// - [`DbError::Cancelled`] / [`DbError::DeadlineExceeded`] if `ctx` fires
    ///   before `work` completes; the transaction is rolled back.
    /// - Whatever `work` returns, after rollback.
    /// - [`DbError::Store`] if begin or commit fails.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from `work` after rolling back.
    pub async fn run<T, F>(&self, ctx: &RequestContext, work: F) -> Result<T, DbError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, DbError>> + Send,
    {
        let mut session = ctx
            .run(SessionConnection::acquire(&self.pool, ctx.principal()))
            .await??;

        let outcome = run_in_transaction(ctx, session.connection(), work).await;
        session.release().await;

        match outcome {
            Outcome::Done(result) => result,
            Outcome::Panicked(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// How a unit of work ended, after its transaction was settled.
enum Outcome<T> {
    Done(Result<T, DbError>),
    Panicked(Box<dyn std::any::Any + Send>),
}

async fn run_in_transaction<T, F>(
    ctx: &RequestContext,
    conn: &mut PgConnection,
    work: F,
) -> Outcome<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, DbError>> + Send,
{
    let mut tx = match ctx.run(begin(conn)).await {
        Ok(Ok(tx)) => tx,
        Ok(Err(e)) => return Outcome::Done(Err(e)),
        Err(reason) => return Outcome::Done(Err(reason.into())),
    };

    // The closure body runs before its future exists; a panic there must
    // settle the transaction too.
    // The caught result is dropped before `tx` is moved on either path.
    let work = 'start: {
        let payload = match std::panic::catch_unwind(AssertUnwindSafe(|| work(&mut *tx))) {
            Ok(work) => break 'start work,
            Err(payload) => payload,
        };
        tracing::error!("unit of work panicked before starting; rolling back");
        rollback(tx).await;
        return Outcome::Panicked(payload);
    };

    let result = ctx.run(AssertUnwindSafe(work).catch_unwind()).await;

    match result {
        Ok(Ok(Ok(value))) => match tx.commit().await {
            Ok(()) => Outcome::Done(Ok(value)),
            Err(e) => Outcome::Done(Err(DbError::store("commit transaction")(e))),
        },
        Ok(Ok(Err(e))) => {
            rollback(tx).await;
            Outcome::Done(Err(e))
        }
        Ok(Err(payload)) => {
            tracing::error!("unit of work panicked; rolling back");
            rollback(tx).await;
            Outcome::Panicked(payload)
        }
        Err(reason) => {
            tracing::debug!(%reason, "unit of work interrupted; rolling back");
            rollback(tx).await;
            Outcome::Done(Err(reason.into()))
        }
    }
}

async fn begin(conn: &mut PgConnection) -> Result<Transaction<'_, Postgres>, DbError> {
    let mut tx = conn.begin().await.map_err(DbError::store("begin transaction"))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
        .execute(&mut *tx)
        .await
        .map_err(DbError::store("set isolation level"))?;
    Ok(tx)
}

async fn rollback(tx: Transaction<'_, Postgres>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "rollback failed");
    }
}
