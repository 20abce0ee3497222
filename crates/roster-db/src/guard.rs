//! Optimistic-concurrency checks shared by the versioned repositories.
//!
//! Every conditional write is a single statement of the form
//!
//! ```sql
//! UPDATE <table> SET ..., updated_at = next_version(updated_at)
//!  WHERE id = $1 AND deleted_at IS NULL
//!    AND updated_at IS NOT DISTINCT FROM $2
//! ```
//!
//! `IS NOT DISTINCT FROM` makes "never modified" (`NULL`) match only
//! `NULL`. When no row comes back, [`explain_miss`] re-checks existence in
//! the same transaction so the caller learns whether to refetch and retry
//! (conflict) or give up (not found).

use roster_types::VersionToken;
use sqlx::PgConnection;

use crate::error::DbError;

/// A table whose rows carry an `updated_at` version column.
#[derive(Debug, Clone, Copy)]
pub struct VersionedTable {
    /// Table name.
    pub table: &'static str,
    /// Entity kind used in error messages.
    pub entity: &'static str,
}

/// Turn a conditional write that matched no row into the right error.
///
/// # Errors
///
/// Returns [`DbError::Store`] if the existence check itself fails.
pub async fn explain_miss(
    conn: &mut PgConnection,
    versioned: VersionedTable,
    id: i64,
) -> Result<DbError, DbError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND deleted_at IS NULL)",
        versioned.table
    );
    let (exists,): (bool,) = sqlx::query_as(&sql)
        .bind(id)
        .fetch_one(conn)
        .await
        .map_err(DbError::store(format!("check {} {id}", versioned.entity)))?;

    if exists {
        tracing::debug!(entity = versioned.entity, id, "stale version token");
        Ok(DbError::conflict(versioned.entity, id))
    } else {
        Ok(DbError::not_found(versioned.entity, id))
    }
}

/// Reject the "never modified" token for writes that need an established
/// baseline.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for [`VersionToken::NEVER_MODIFIED`].
pub fn require_baseline(token: VersionToken, entity: &'static str, id: i64) -> Result<(), DbError> {
    if token.is_never_modified() {
        return Err(DbError::Validation(format!(
            "{entity} {id}: a version token from a previous read is required"
        )));
    }
    Ok(())
}
