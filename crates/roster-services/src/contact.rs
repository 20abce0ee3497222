//! Contact use cases.
//!
//! Contacts are looked up rarely and never modified, so reads always go to
//! the store.

use futures::FutureExt as _;
use roster_core::RequestContext;
use roster_db::{ContactRepo, DbError, TransactionalExecutor};
use roster_types::{Contact, ContactId, NewContact, Paging};
use validator::Validate as _;

/// Contact reads and inserts.
#[derive(Clone)]
pub struct ContactService {
    executor: TransactionalExecutor,
}

impl ContactService {
    /// Create the service.
    pub const fn new(executor: TransactionalExecutor) -> Self {
        Self { executor }
    }

    /// Fetch a contact.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the contact does not exist.
    pub async fn find_by_id(&self, ctx: &RequestContext, id: ContactId) -> Result<Contact, DbError> {
        self.executor
            .run(ctx, move |conn| {
                async move { ContactRepo::new(conn).find_by_id(id).await }.boxed()
            })
            .await
    }

    /// One page of contacts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn find_all(&self, ctx: &RequestContext, paging: Paging) -> Result<Vec<Contact>, DbError> {
        self.executor
            .run(ctx, move |conn| {
                async move { ContactRepo::new(conn).find_all(paging).await }.boxed()
            })
            .await
    }

    /// Create a contact.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] before any store access if `contact`
    /// is malformed.
    pub async fn create(&self, ctx: &RequestContext, contact: NewContact) -> Result<Contact, DbError> {
        contact.validate()?;
        let created = self
            .executor
            .run(ctx, move |conn| {
                async move { ContactRepo::new(conn).create(&contact).await }.boxed()
            })
            .await?;
        tracing::info!(id = %created.id, "Contact created");
        Ok(created)
    }
}
