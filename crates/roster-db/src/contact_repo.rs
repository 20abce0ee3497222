//! Contact persistence on the `contact_entity` table.

use chrono::{DateTime, Utc};
use roster_types::{Audit, Contact, ContactId, NewContact, Paging, PrincipalId};
use sqlx::PgConnection;

use crate::error::DbError;

const ENTITY: &str = "contact";

const COLUMNS: &str = "id, first_name, surname, email, created_at, created_by, updated_at, updated_by";

/// Read and insert operations on `contact_entity` within one transaction.
pub struct ContactRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ContactRepo<'c> {
    /// Bind the repository to a transaction's connection.
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Fetch a live contact by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no live row has this id.
    pub async fn find_by_id(&mut self, id: ContactId) -> Result<Contact, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM contact_entity WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("find contact {id}")))?
            .map(ContactRow::into_contact)
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// One page of live contacts ordered by surname.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the query fails.
    pub async fn find_all(&mut self, paging: Paging) -> Result<Vec<Contact>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM contact_entity WHERE deleted_at IS NULL \
             ORDER BY surname ASC, id ASC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(i64::from(paging.limit))
            .bind(paging.offset())
            .fetch_all(&mut *self.conn)
            .await
            .map_err(DbError::store("find all contacts"))?;
        Ok(rows.into_iter().map(ContactRow::into_contact).collect())
    }

    /// Number of live contacts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the query fails.
    pub async fn count(&mut self) -> Result<i64, DbError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM contact_entity WHERE deleted_at IS NULL")
                .fetch_one(&mut *self.conn)
                .await
                .map_err(DbError::store("count contacts"))?;
        Ok(count)
    }

    /// Insert a contact.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the insert fails.
    pub async fn create(&mut self, contact: &NewContact) -> Result<Contact, DbError> {
        let sql = format!(
            "INSERT INTO contact_entity (first_name, surname, email) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(contact.first_name.as_deref())
            .bind(&contact.surname)
            .bind(contact.email.as_deref())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(DbError::store(format!("create contact {}", contact.surname)))?;
        tracing::debug!(id = row.id, "Created contact");
        Ok(row.into_contact())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ContactRow {
    id: i64,
    first_name: Option<String>,
    surname: String,
    email: Option<String>,
    created_at: Option<DateTime<Utc>>,
    created_by: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<i64>,
}

impl ContactRow {
    fn into_contact(self) -> Contact {
        Contact {
            id: ContactId(self.id),
            first_name: self.first_name,
            surname: self.surname,
            email: self.email,
            audit: Audit {
                created_at: self.created_at,
                created_by: self.created_by.map(PrincipalId),
                updated_at: self.updated_at,
                updated_by: self.updated_by.map(PrincipalId),
            },
        }
    }
}
