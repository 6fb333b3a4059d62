//! Record and identifier types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque record identifier.
///
/// Freshly minted ids are UUIDv7 strings, so they sort by creation time, but
/// any non-blank string supplied by a caller is accepted as a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Mint a new, never-before-used identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap a caller-supplied identifier, rejecting blank input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "id".to_string(),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for RecordId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The unit of storage held by every tier.
///
/// `created_at` is the time of the most recent write, not of the first one:
/// updates overwrite it together with `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Record {
    pub id: RecordId,
    pub value: String,
    #[cfg_attr(feature = "openapi", schema(value_type = DateTime<Utc>))]
    pub created_at: Timestamp,
}

impl Record {
    /// Build a brand new record with a freshly minted id, stamped now.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: RecordId::generate(),
            value: value.into(),
            created_at: Utc::now(),
        }
    }

    /// Build a record for a known id (used by tiers when decoding).
    pub fn with_id(id: RecordId, value: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id,
            value: value.into(),
            created_at,
        }
    }

    /// Replace the payload and restamp the write time.
    pub fn overwrite(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.created_at = Utc::now();
    }
}

/// Reject blank record payloads before they reach any tier.
pub fn validate_value(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "value".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_parse_rejects_blank_id() {
        assert!(RecordId::parse("").is_err());
        assert!(RecordId::parse("   ").is_err());
        assert_eq!(RecordId::parse("abc").map(|id| id.into_inner()), Ok("abc".to_string()));
    }

    #[test]
    fn test_overwrite_replaces_value_and_timestamp() {
        let mut record = Record::new("first");
        let id = record.id.clone();
        let before = record.created_at;

        record.overwrite("second");

        assert_eq!(record.id, id);
        assert_eq!(record.value, "second");
        assert!(record.created_at >= before);
    }

    #[test]
    fn test_record_serializes_id_as_plain_string() -> Result<(), serde_json::Error> {
        let id = RecordId::generate();
        let record = Record::with_id(id.clone(), "payload", Utc::now());
        let json = serde_json::to_value(&record)?;
        assert_eq!(json["id"], id.as_str());
        assert_eq!(json["value"], "payload");
        Ok(())
    }

    #[test]
    fn test_validate_value() {
        assert!(validate_value("hello").is_ok());
        assert!(validate_value("").is_err());
        assert!(validate_value("\t\n").is_err());
    }

    proptest! {
        #[test]
        fn prop_non_blank_ids_parse(raw in "[a-zA-Z0-9_-]{1,40}") {
            let id = RecordId::parse(raw.clone());
            prop_assert!(id.is_ok());
            prop_assert_eq!(id.map(|id| id.to_string()).unwrap_or_default(), raw);
        }
    }
}
