//! Type-safe identifier wrappers around `i64` database keys.
//!
//! Every entity has a strongly-typed ID so a player id can never be
//! passed where a client id is expected. Keys are `BIGSERIAL` columns
//! assigned by `PostgreSQL` on insert.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the inner key value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a player row.
    PlayerId
}

define_id! {
    /// Unique identifier for a client account row.
    ClientId
}

define_id! {
    /// Unique identifier for a contact row.
    ContactId
}

define_id! {
    /// Identity of the caller on whose behalf a transaction runs.
    ///
    /// Written into the connection's session state so audit triggers can
    /// attribute every mutation without threading the principal through
    /// each repository call.
    PrincipalId
}

impl PrincipalId {
    /// Reserved principal for work the process performs on its own behalf
    /// (script loading, schedulers).
    pub const SYSTEM: Self = Self(-1);

    /// Whether this is the reserved system principal.
    pub const fn is_system(self) -> bool {
        self.0 == Self::SYSTEM.0
    }
}
