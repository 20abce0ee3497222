//! Player use cases.
//!
//! Reads go through a short-lived [`ReadCache`] first; players check in
//! often, so their entries live for seconds rather than minutes. Every
//! write invalidates the player's entry once its transaction has settled.

use std::time::Duration;

use futures::FutureExt as _;
use roster_core::{ReadCache, RequestContext};
use roster_db::{DbError, PlayerRepo, TransactionalExecutor, guard};
use roster_types::{NewPlayer, Paging, Player, PlayerChanges, PlayerId, VersionToken};
use validator::Validate as _;

/// Player reads and version-guarded writes.
#[derive(Clone)]
pub struct PlayerService {
    executor: TransactionalExecutor,
    cache: ReadCache<PlayerId, Player>,
    ttl: Duration,
}

impl PlayerService {
    /// Create the service. A zero `ttl` disables caching.
    pub const fn new(
        executor: TransactionalExecutor,
        cache: ReadCache<PlayerId, Player>,
        ttl: Duration,
    ) -> Self {
        Self {
            executor,
            cache,
            ttl,
        }
    }

    /// The cache in front of player reads.
    pub const fn cache(&self) -> &ReadCache<PlayerId, Player> {
        &self.cache
    }

    /// Fetch a player, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the player does not exist.
    pub async fn find_by_id(&self, ctx: &RequestContext, id: PlayerId) -> Result<Player, DbError> {
        if let Some(player) = self.cache.get(&id) {
            return Ok(player);
        }
        let player = self
            .executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).find_by_id(id).await }.boxed()
            })
            .await?;
        self.cache.put(id, player.clone(), player.cost(), self.ttl);
        Ok(player)
    }

    /// Fetch a player by external resource id. Not cached.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no player has this resource id.
    pub async fn find_by_resource_id(
        &self,
        ctx: &RequestContext,
        resource_id: String,
    ) -> Result<Player, DbError> {
        self.executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).find_by_resource_id(&resource_id).await }.boxed()
            })
            .await
    }

    /// One page of players.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn find_all(&self, ctx: &RequestContext, paging: Paging) -> Result<Vec<Player>, DbError> {
        self.executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).find_all(paging).await }.boxed()
            })
            .await
    }

    /// Create a player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] before any store access if `player`
    /// is malformed, and [`DbError::Duplicate`] if the resource id is taken.
    pub async fn create(&self, ctx: &RequestContext, player: NewPlayer) -> Result<Player, DbError> {
        player.validate()?;
        let created = self
            .executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).create(&player).await }.boxed()
            })
            .await?;
        tracing::info!(id = %created.id, "Player created");
        Ok(created)
    }

    /// Record a check-in if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] for a stale token and
    /// [`DbError::NotFound`] if the player does not exist.
    pub async fn checkin(
        &self,
        ctx: &RequestContext,
        id: PlayerId,
        token: VersionToken,
    ) -> Result<Player, DbError> {
        let result = self
            .executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).checkin(id, token).await }.boxed()
            })
            .await;
        self.cache.invalidate(&id);
        result
    }

    /// Update name and description if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] before any store access for bad input
    /// or the "never modified" token, [`DbError::Conflict`] for a stale
    /// token and [`DbError::NotFound`] if the player does not exist.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: PlayerId,
        token: VersionToken,
        changes: PlayerChanges,
    ) -> Result<Player, DbError> {
        changes.validate()?;
        guard::require_baseline(token, "player", id.into_inner())?;
        let result = self
            .executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).update(id, token, &changes).await }.boxed()
            })
            .await;
        self.cache.invalidate(&id);
        result
    }

    /// Soft-delete a player if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] for a stale token and
    /// [`DbError::NotFound`] if the player does not exist.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: PlayerId,
        token: VersionToken,
    ) -> Result<(), DbError> {
        let result = self
            .executor
            .run(ctx, move |conn| {
                async move { PlayerRepo::new(conn).delete(id, token).await }.boxed()
            })
            .await;
        self.cache.invalidate(&id);
        result
    }
}
