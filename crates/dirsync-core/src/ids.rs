//! Strongly Typed Identifiers
//!
//! Local identifiers for reconciled entities. Directory identifiers stay
//! plain strings because their format belongs to the directory (objectGUID,
//! entryUUID, ...), while local identifiers are store-assigned UUIDs.
//!
//! # Example
//!
//! ```
//! use dirsync_core::{GroupId, MappingId};
//!
//! let group = GroupId::new();
//! let mapping = MappingId::new();
//!
//! fn requires_group(id: GroupId) -> String {
//!     id.to_string()
//! }
//!
//! let _ = requires_group(group);
//! // requires_group(mapping); // This would not compile!
//! # let _ = mapping;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Local identifier of a [`Group`](crate::Group), assigned by the store.
    GroupId
);

define_id!(
    /// Local identifier of a [`GroupMapping`](crate::GroupMapping).
    MappingId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_distinct_ids() {
        let a = GroupId::new();
        let b = GroupId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = MappingId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn test_parse_round_trip() {
        let parsed: GroupId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(parsed.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_parse_error_names_type() {
        let err = "not-a-uuid".parse::<MappingId>().unwrap_err();
        assert_eq!(err.id_type, "MappingId");
        assert!(err.to_string().starts_with("Failed to parse MappingId"));
    }

    #[test]
    fn test_serde_is_transparent() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&GroupId::from_uuid(uuid)).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
    }
}
