//! Client account use cases.
//!
//! Single-client reads are read-through cached for the configured client
//! TTL (five minutes by default). Listings and counts always hit the store.

use std::time::Duration;

use futures::FutureExt as _;
use roster_core::{ReadCache, RequestContext};
use roster_db::{ClientRepo, DbError, TransactionalExecutor, guard};
use roster_types::{Client, ClientChanges, ClientId, NewClient, Paging, VersionToken};
use validator::Validate as _;

/// Client reads and version-guarded writes.
#[derive(Clone)]
pub struct ClientService {
    executor: TransactionalExecutor,
    cache: ReadCache<ClientId, Client>,
    ttl: Duration,
}

impl ClientService {
    /// Create the service.
    pub const fn new(
        executor: TransactionalExecutor,
        cache: ReadCache<ClientId, Client>,
        ttl: Duration,
    ) -> Self {
        Self {
            executor,
            cache,
            ttl,
        }
    }

    /// The cache in front of client reads.
    pub const fn cache(&self) -> &ReadCache<ClientId, Client> {
        &self.cache
    }

    /// Fetch a client, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the client does not exist.
    pub async fn find_by_id(&self, ctx: &RequestContext, id: ClientId) -> Result<Client, DbError> {
        if let Some(client) = self.cache.get(&id) {
            tracing::trace!(%id, "client cache hit");
            return Ok(client);
        }
        let client = self
            .executor
            .run(ctx, move |conn| {
                async move { ClientRepo::new(conn).find_by_id(id).await }.boxed()
            })
            .await?;
        self.cache.put(id, client.clone(), client.cost(), self.ttl);
        Ok(client)
    }

    /// One page of clients.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn find_all(&self, ctx: &RequestContext, paging: Paging) -> Result<Vec<Client>, DbError> {
        self.executor
            .run(ctx, move |conn| {
                async move { ClientRepo::new(conn).find_all(paging).await }.boxed()
            })
            .await
    }

    /// Number of live clients.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn count(&self, ctx: &RequestContext) -> Result<i64, DbError> {
        self.executor
            .run(ctx, |conn| async move { ClientRepo::new(conn).count().await }.boxed())
            .await
    }

    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] before any store access if `client`
    /// is malformed, and [`DbError::Duplicate`] if the account is taken.
    pub async fn create(&self, ctx: &RequestContext, client: NewClient) -> Result<Client, DbError> {
        client.validate()?;
        let created = self
            .executor
            .run(ctx, move |conn| {
                async move { ClientRepo::new(conn).create(&client).await }.boxed()
            })
            .await?;
        tracing::info!(id = %created.id, "Client created");
        Ok(created)
    }

    /// Rename a client if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] before any store access for bad input
    /// or the "never modified" token, [`DbError::Conflict`] for a stale
    /// token and [`DbError::NotFound`] if the client does not exist.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: ClientId,
        token: VersionToken,
        changes: ClientChanges,
    ) -> Result<Client, DbError> {
        changes.validate()?;
        guard::require_baseline(token, "client", id.into_inner())?;
        let result = self
            .executor
            .run(ctx, move |conn| {
                async move { ClientRepo::new(conn).update(id, token, &changes).await }.boxed()
            })
            .await;
        self.cache.invalidate(&id);
        result
    }

    /// Soft-delete a client if `token` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] for a stale token and
    /// [`DbError::NotFound`] if the client does not exist.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: ClientId,
        token: VersionToken,
    ) -> Result<(), DbError> {
        let result = self
            .executor
            .run(ctx, move |conn| {
                async move { ClientRepo::new(conn).delete(id, token).await }.boxed()
            })
            .await;
        self.cache.invalidate(&id);
        result
    }
}
