//! Player persistence on the `player_entity` table.
//!
//! A [`PlayerRepo`] borrows the connection of the transaction it runs in;
//! construct one inside a [`TransactionalExecutor::run`] unit of work.
//!
//! [`TransactionalExecutor::run`]: crate::executor::TransactionalExecutor::run

use chrono::{DateTime, Utc};
use roster_types::{Audit, NewPlayer, Paging, Player, PlayerChanges, PlayerId, PrincipalId, VersionToken};
use sqlx::PgConnection;

use crate::error::DbError;
use crate::guard::{self, VersionedTable};

const PLAYERS: VersionedTable = VersionedTable {
    table: "player_entity",
    entity: "player",
};

const COLUMNS: &str = "id, resource_id, name, description, last_checkin, \
                       created_at, created_by, updated_at, updated_by";

/// Operations on the `player_entity` table within one transaction.
pub struct PlayerRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PlayerRepo<'c> {
    /// Bind the repository to a transaction's connection.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Fetch a live player by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no live row has this id.
    pub async fn find_by_id(&mut self, id: PlayerId) -> Result<Player, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM player_entity WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("find player {id}")))?
            .map(PlayerRow::into_player)
            .ok_or_else(|| DbError::not_found(PLAYERS.entity, id))
    }

    /// Fetch a live player by its external resource id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no live row has this resource id.
    pub async fn find_by_resource_id(&mut self, resource_id: &str) -> Result<Player, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM player_entity WHERE resource_id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(resource_id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("find player {resource_id}")))?
            .map(PlayerRow::into_player)
            .ok_or_else(|| DbError::not_found(PLAYERS.entity, resource_id))
    }

    /// One page of live players ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the query fails.
    pub async fn find_all(&mut self, paging: Paging) -> Result<Vec<Player>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM player_entity WHERE deleted_at IS NULL \
             ORDER BY name ASC, id ASC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(i64::from(paging.limit))
            .bind(paging.offset())
            .fetch_all(&mut *self.conn)
            .await
            .map_err(DbError::store("find all players"))?;
        Ok(rows.into_iter().map(PlayerRow::into_player).collect())
    }

    /// Insert a player. Audit columns are filled in by the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the resource id is taken.
    pub async fn create(&mut self, player: &NewPlayer) -> Result<Player, DbError> {
        let sql = format!(
            "INSERT INTO player_entity (resource_id, name, description) \
             VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(&player.resource_id)
            .bind(&player.name)
            .bind(&player.description)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| {
                if DbError::is_unique_violation(&e) {
                    DbError::Duplicate {
                        entity: PLAYERS.entity,
                        key: format!("resource_id {}", player.resource_id),
                    }
                } else {
                    DbError::store(format!("create player {}", player.resource_id))(e)
                }
            })?;
        tracing::debug!(id = row.id, "Created player");
        Ok(row.into_player())
    }

    /// Stamp `last_checkin` if `token` is still current.
    ///
    /// The "never modified" token is valid here: it matches a player that
    /// has not been written since creation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] for a stale token and
    /// [`DbError::NotFound`] if the player does not exist.
    pub async fn checkin(&mut self, id: PlayerId, token: VersionToken) -> Result<Player, DbError> {
        let sql = format!(
            "UPDATE player_entity \
                SET last_checkin = clock_timestamp(), updated_at = next_version(updated_at) \
              WHERE id = $1 AND deleted_at IS NULL AND updated_at IS NOT DISTINCT FROM $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(id.into_inner())
            .bind(token.instant())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("checkin player {id}")))?;
        self.settle(id, row).await
    }

    /// Replace the mutable fields if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for the "never modified" token,
    /// [`DbError::Conflict`] for a stale token and [`DbError::NotFound`]
    /// if the player does not exist.
    pub async fn update(
        &mut self,
        id: PlayerId,
        token: VersionToken,
        changes: &PlayerChanges,
    ) -> Result<Player, DbError> {
        guard::require_baseline(token, PLAYERS.entity, id.into_inner())?;
        let sql = format!(
            "UPDATE player_entity \
                SET name = $3, description = $4, updated_at = next_version(updated_at) \
              WHERE id = $1 AND deleted_at IS NULL AND updated_at IS NOT DISTINCT FROM $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(id.into_inner())
            .bind(token.instant())
            .bind(&changes.name)
            .bind(&changes.description)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("update player {id}")))?;
        self.settle(id, row).await
    }

    /// Soft-delete the player if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] for a stale token and
    /// [`DbError::NotFound`] if the player does not exist.
    pub async fn delete(&mut self, id: PlayerId, token: VersionToken) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE player_entity \
                SET deleted_at = clock_timestamp(), updated_at = next_version(updated_at) \
              WHERE id = $1 AND deleted_at IS NULL AND updated_at IS NOT DISTINCT FROM $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(id.into_inner())
            .bind(token.instant())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("delete player {id}")))?;
        self.settle(id, row).await?;
        tracing::debug!(%id, "Deleted player");
        Ok(())
    }

    async fn settle(&mut self, id: PlayerId, row: Option<PlayerRow>) -> Result<Player, DbError> {
        match row {
            Some(row) => Ok(row.into_player()),
            None => Err(guard::explain_miss(&mut *self.conn, PLAYERS, id.into_inner()).await?),
        }
    }
}

/// A row from `player_entity`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PlayerRow {
    id: i64,
    resource_id: String,
    name: String,
    description: Option<String>,
    last_checkin: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    created_by: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<i64>,
}

impl PlayerRow {
    fn into_player(self) -> Player {
        Player {
            id: PlayerId(self.id),
            resource_id: self.resource_id,
            name: self.name,
            description: self.description,
            last_checkin: self.last_checkin,
            audit: Audit {
                created_at: self.created_at,
                created_by: self.created_by.map(PrincipalId),
                updated_at: self.updated_at,
                updated_by: self.updated_by.map(PrincipalId),
            },
        }
    }
}
