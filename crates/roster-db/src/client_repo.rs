//! Client account persistence on the `client_entity` table.

use chrono::{DateTime, Utc};
use roster_types::{Audit, Client, ClientChanges, ClientId, NewClient, Paging, PrincipalId, VersionToken};
use sqlx::PgConnection;

use crate::error::DbError;
use crate::guard::{self, VersionedTable};

const CLIENTS: VersionedTable = VersionedTable {
    table: "client_entity",
    entity: "client",
};

const COLUMNS: &str = "id, account_no, account_name, created_at, created_by, updated_at, updated_by";

/// Operations on the `client_entity` table within one transaction.
pub struct ClientRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ClientRepo<'c> {
    /// Bind the repository to a transaction's connection.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Fetch a live client by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no live row has this id.
    pub async fn find_by_id(&mut self, id: ClientId) -> Result<Client, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM client_entity WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("find client {id}")))?
            .map(ClientRow::into_client)
            .ok_or_else(|| DbError::not_found(CLIENTS.entity, id))
    }

    /// One page of live clients ordered by account name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the query fails.
    pub async fn find_all(&mut self, paging: Paging) -> Result<Vec<Client>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM client_entity WHERE deleted_at IS NULL \
             ORDER BY account_name ASC, id ASC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(i64::from(paging.limit))
            .bind(paging.offset())
            .fetch_all(&mut *self.conn)
            .await
            .map_err(DbError::store("find all clients"))?;
        Ok(rows.into_iter().map(ClientRow::into_client).collect())
    }

    /// Number of live clients.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the query fails.
    pub async fn count(&mut self) -> Result<i64, DbError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM client_entity WHERE deleted_at IS NULL")
                .fetch_one(&mut *self.conn)
                .await
                .map_err(DbError::store("count clients"))?;
        Ok(count)
    }

    /// Insert a client.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the account number is taken.
    pub async fn create(&mut self, client: &NewClient) -> Result<Client, DbError> {
        let sql = format!(
            "INSERT INTO client_entity (account_no, account_name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(&client.account_no)
            .bind(&client.account_name)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| {
                if DbError::is_unique_violation(&e) {
                    DbError::Duplicate {
                        entity: CLIENTS.entity,
                        key: format!("account_no {}", client.account_no),
                    }
                } else {
                    DbError::store(format!("create client {}", client.account_no))(e)
                }
            })?;
        tracing::debug!(id = row.id, "Created client");
        Ok(row.into_client())
    }

    /// Rename the account holder if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for the "never modified" token,
    /// [`DbError::Conflict`] for a stale token and [`DbError::NotFound`]
    /// if the client does not exist.
    pub async fn update(
        &mut self,
        id: ClientId,
        token: VersionToken,
        changes: &ClientChanges,
    ) -> Result<Client, DbError> {
        guard::require_baseline(token, CLIENTS.entity, id.into_inner())?;
        let sql = format!(
            "UPDATE client_entity \
                SET account_name = $3, updated_at = next_version(updated_at) \
              WHERE id = $1 AND deleted_at IS NULL AND updated_at IS NOT DISTINCT FROM $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id.into_inner())
            .bind(token.instant())
            .bind(&changes.account_name)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("update client {id}")))?;
        self.settle(id, row).await
    }

    /// Soft-delete the client if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] for a stale token and
    /// [`DbError::NotFound`] if the client does not exist.
    pub async fn delete(&mut self, id: ClientId, token: VersionToken) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE client_entity \
                SET deleted_at = clock_timestamp(), updated_at = next_version(updated_at) \
              WHERE id = $1 AND deleted_at IS NULL AND updated_at IS NOT DISTINCT FROM $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id.into_inner())
            .bind(token.instant())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("delete client {id}")))?;
        self.settle(id, row).await?;
        Ok(())
    }

    async fn settle(&mut self, id: ClientId, row: Option<ClientRow>) -> Result<Client, DbError> {
        match row {
            Some(row) => Ok(row.into_client()),
            None => Err(guard::explain_miss(&mut *self.conn, CLIENTS, id.into_inner()).await?),
        }
    }
}

/// A row from `client_entity`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ClientRow {
    id: i64,
    account_no: String,
    account_name: String,
    created_at: Option<DateTime<Utc>>,
    created_by: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<i64>,
}

impl ClientRow {
    fn into_client(self) -> Client {
        Client {
            id: ClientId(self.id),
            account_no: self.account_no,
            account_name: self.account_name,
            audit: Audit {
                created_at: self.created_at,
                created_by: self.created_by.map(PrincipalId),
                updated_at: self.updated_at,
                updated_by: self.updated_by.map(PrincipalId),
            },
        }
    }
}
