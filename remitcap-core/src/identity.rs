//! Identity types for RemitCap entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour of the strongly-typed entity identifiers.
///
/// Identifiers are UUIDv7 so they sort by creation time, and every one of
/// them renders as the hyphenated UUID string used inside cache keys.
pub trait EntityIdType: Copy + Eq + std::hash::Hash + fmt::Display {
    /// Wrap an existing UUID.
    fn new(id: Uuid) -> Self;

    /// Get the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The nil identifier; never issued by the authority.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }

    /// Whether this is the nil identifier.
    fn is_nil(&self) -> bool {
        self.as_uuid().is_nil()
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(id: Uuid) -> Self {
                Self(id)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_entity_id!(
    /// A money-transfer business (tenant).
    BusinessId
);
define_entity_id!(
    /// A customer record owned by one business.
    CustomerId
);
define_entity_id!(
    /// A signed-in operator acting on behalf of a business.
    UserId
);
define_entity_id!(
    /// A recorded transfer.
    TransferId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_plain_uuid() {
        let uuid = Uuid::now_v7();
        let id = BusinessId::new(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn test_nil_detection() {
        assert!(CustomerId::nil().is_nil());
        assert!(!CustomerId::now_v7().is_nil());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = TransferId::now_v7();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: TransferId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
