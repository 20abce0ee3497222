//! Entity and input structs shared across the workspace.
//!
//! Entities mirror the database rows. Input structs (`New*`, `*Changes`)
//! carry caller-supplied data and are checked with [`validator`] before any
//! store access happens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ids::{ClientId, ContactId, PlayerId, PrincipalId};
use crate::version::VersionToken;

/// Default page size when the caller does not supply one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

// =============================================================================
// Audit columns
// =============================================================================

/// Audit columns populated by database triggers from the session principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    /// When the row was inserted.
    pub created_at: Option<DateTime<Utc>>,
    /// Principal active when the row was inserted.
    pub created_by: Option<PrincipalId>,
    /// Last modification instant, `None` until the first update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Principal active at the last modification.
    pub updated_by: Option<PrincipalId>,
}

// =============================================================================
// Player
// =============================================================================

/// A player row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Primary key.
    pub id: PlayerId,
    /// External resource identifier, unique.
    pub resource_id: String,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// When the player last checked in, `None` if never.
    pub last_checkin: Option<DateTime<Utc>>,
    /// Audit columns.
    pub audit: Audit,
}

impl Player {
    /// The version token a caller must present to modify this player.
    pub const fn version(&self) -> VersionToken {
        VersionToken::from_instant(self.audit.updated_at)
    }

    /// Approximate resident size, used as the cache admission cost.
    pub fn cost(&self) -> u32 {
        let bytes = self
            .resource_id
            .len()
            .saturating_add(self.name.len())
            .saturating_add(self.description.as_ref().map_or(0, String::len))
            .saturating_add(core::mem::size_of::<Self>());
        u32::try_from(bytes).unwrap_or(u32::MAX)
    }
}

/// Input for creating a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewPlayer {
    /// External resource identifier.
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub resource_id: String,
    /// Display name.
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub name: String,
    /// Optional description.
    #[validate(length(min = 1, max = 50))]
    pub description: Option<String>,
}

/// Mutable player fields for a conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PlayerChanges {
    /// New display name.
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub name: String,
    /// New description, `None` clears it.
    #[validate(length(min = 1, max = 50))]
    pub description: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// A client account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Primary key.
    pub id: ClientId,
    /// Account number, unique.
    pub account_no: String,
    /// Account holder name.
    pub account_name: String,
    /// Audit columns.
    pub audit: Audit,
}

impl Client {
    /// The version token a caller must present to modify this client.
    pub const fn version(&self) -> VersionToken {
        VersionToken::from_instant(self.audit.updated_at)
    }

    /// Approximate resident size, used as the cache admission cost.
    pub fn cost(&self) -> u32 {
        let bytes = self
            .account_no
            .len()
            .saturating_add(self.account_name.len())
            .saturating_add(core::mem::size_of::<Self>());
        u32::try_from(bytes).unwrap_or(u32::MAX)
    }
}

/// Input for creating a client, also one row of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewClient {
    /// Account number.
    #[validate(length(min = 1, max = 30), custom(function = "not_blank"))]
    pub account_no: String,
    /// Account holder name.
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub account_name: String,
}

/// Mutable client fields for a conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClientChanges {
    /// New account holder name.
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub account_name: String,
}

// =============================================================================
// Contact
// =============================================================================

/// A contact person row. Contacts are created and read, never versioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Primary key.
    pub id: ContactId,
    /// Given name, if known.
    pub first_name: Option<String>,
    /// Family name.
    pub surname: String,
    /// Email address, if known.
    pub email: Option<String>,
    /// Audit columns.
    pub audit: Audit,
}

impl Contact {
    /// Approximate resident size, used as the cache admission cost.
    pub fn cost(&self) -> u32 {
        let bytes = self
            .first_name
            .as_ref()
            .map_or(0, String::len)
            .saturating_add(self.surname.len())
            .saturating_add(self.email.as_ref().map_or(0, String::len))
            .saturating_add(core::mem::size_of::<Self>());
        u32::try_from(bytes).unwrap_or(u32::MAX)
    }
}

/// Input for creating a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewContact {
    /// Given name.
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    /// Family name.
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub surname: String,
    /// Email address.
    #[validate(email, length(max = 100))]
    pub email: Option<String>,
}

// =============================================================================
// Paging
// =============================================================================

/// 0-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Page number, starting at 0.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
}

impl Paging {
    /// Build a page request. A zero limit selects the default, and limits
    /// above [`MAX_PAGE_LIMIT`] are clamped.
    pub fn new(page: u32, limit: u32) -> Self {
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            l => l.min(MAX_PAGE_LIMIT),
        };
        Self { page, limit }
    }

    /// Number of rows to skip.
    pub fn offset(self) -> i64 {
        i64::from(self.page).saturating_mul(i64::from(self.limit))
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_fail_validation() {
        let player = NewPlayer {
            resource_id: "res-1".to_owned(),
            name: "   ".to_owned(),
            description: None,
        };
        let errors = player.validate().err();
        assert!(errors.is_some_and(|e| e.field_errors().contains_key("name")));
    }

    #[test]
    fn empty_description_is_rejected_but_absent_is_fine() {
        let mut changes = PlayerChanges {
            name: "Ada".to_owned(),
            description: Some(String::new()),
        };
        assert!(changes.validate().is_err());
        changes.description = None;
        assert!(changes.validate().is_ok());
    }

    #[test]
    fn oversized_account_numbers_are_rejected() {
        let client = NewClient {
            account_no: "X".repeat(31),
            account_name: "XYZ Trading".to_owned(),
        };
        assert!(client.validate().is_err());
    }

    #[test]
    fn contact_email_must_be_an_address() {
        let mut contact = NewContact {
            first_name: Some("Grace".to_owned()),
            surname: "Hopper".to_owned(),
            email: Some("not-an-address".to_owned()),
        };
        assert!(contact.validate().is_err());
        contact.email = Some("grace@example.com".to_owned());
        assert!(contact.validate().is_ok());
        contact.email = None;
        contact.first_name = None;
        assert!(contact.validate().is_ok());
    }

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(Paging::new(0, 0).limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(Paging::new(0, 10_000).limit, MAX_PAGE_LIMIT);
        assert_eq!(Paging::new(3, 20).offset(), 60);
    }

    #[test]
    fn version_follows_updated_at() {
        let mut player = Player {
            id: PlayerId(5),
            resource_id: "res-5".to_owned(),
            name: "Ada".to_owned(),
            description: None,
            last_checkin: None,
            audit: Audit::default(),
        };
        assert!(player.version().is_never_modified());
        player.audit.updated_at = DateTime::from_timestamp_micros(10);
        assert_eq!(player.version().as_micros(), 10);
    }
}
