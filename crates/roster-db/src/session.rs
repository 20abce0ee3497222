//! Connection-scoped session identity.
//!
//! [`SessionConnection`] is the "with-session" acquisition wrapper: it takes
//! a connection from the pool, writes the caller's principal into the
//! `app.principal_id` setting, and must be handed back through
//! [`SessionConnection::release`], which clears the setting before the
//! connection returns to the pool. If the wrapper is dropped without a
//! release (a panic unwinding through it, or its future being cancelled)
//! the connection is closed instead of returned, so a stale principal can
//! never leak into another caller's transaction.

use roster_types::PrincipalId;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::error::DbError;

/// Statement binding the principal into connection-scoped state.
const SET_PRINCIPAL: &str = "SELECT set_config('app.principal_id', $1, false)";

/// A pooled connection carrying a bound principal until released.
pub struct SessionConnection {
    conn: PoolConnection<Postgres>,
    principal: Option<PrincipalId>,
    clean: bool,
}

impl SessionConnection {
    /// Acquire a connection and bind `principal` (or "no principal") to it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Resource`] if no connection can be acquired and
    /// [`DbError::Store`] if the session setting cannot be written.
    pub async fn acquire(pool: &PgPool, principal: Option<PrincipalId>) -> Result<Self, DbError> {
        let conn = pool.acquire().await.map_err(DbError::Resource)?;
        let mut session = Self {
            conn,
            principal,
            clean: false,
        };
        if principal.is_none() {
            tracing::debug!("binding session without a principal");
        }
        bind(&mut session.conn, principal)
            .await
            .map_err(DbError::store("bind session principal"))?;
        Ok(session)
    }

    /// The principal bound to this connection.
    pub const fn principal(&self) -> Option<PrincipalId> {
        self.principal
    }

    /// The underlying connection.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    /// Clear the session principal and return the connection to the pool.
    ///
    /// If the reset fails the connection is closed rather than reused.
    pub async fn release(mut self) {
        match bind(&mut self.conn, None).await {
            Ok(()) => self.clean = true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to reset session principal; closing connection");
            }
        }
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        if !self.clean {
            self.conn.close_on_drop();
        }
    }
}

async fn bind(conn: &mut PgConnection, principal: Option<PrincipalId>) -> Result<(), sqlx::Error> {
    let value = principal.map(|p| p.to_string()).unwrap_or_default();
    sqlx::query(SET_PRINCIPAL).bind(value).execute(conn).await?;
    Ok(())
}

/// Read the principal currently bound to the connection's session.
///
/// # Errors
///
/// Returns [`DbError::Store`] if the query fails.
pub async fn current_principal(conn: &mut PgConnection) -> Result<Option<PrincipalId>, DbError> {
    let (id,): (Option<i64>,) = sqlx::query_as("SELECT current_principal_id()")
        .fetch_one(conn)
        .await
        .map_err(DbError::store("read session principal"))?;
    Ok(id.map(PrincipalId))
}
