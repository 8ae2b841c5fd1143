//! Directory group records.
//!
//! A [`DirectoryGroupRecord`] is one group as read from the directory for a
//! single run. Records are immutable once produced and identified by their
//! `directory_id`; the distinguished name may differ between runs when the
//! group is moved in the tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A group object fetched from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroupRecord {
    /// Stable unique identifier (objectGUID, entryUUID, ...).
    pub directory_id: String,
    /// Short account name (sAMAccountName or cn).
    pub account_name: String,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current location of the group in the directory tree.
    pub distinguished_name: String,
}

impl DirectoryGroupRecord {
    /// Create a record with the mandatory attributes.
    pub fn new(
        directory_id: impl Into<String>,
        account_name: impl Into<String>,
        distinguished_name: impl Into<String>,
    ) -> Self {
        Self {
            directory_id: directory_id.into(),
            account_name: account_name.into(),
            display_name: None,
            description: None,
            distinguished_name: distinguished_name.into(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check that the mandatory attributes are present.
    ///
    /// Blank identifiers and account names are rejected. An empty
    /// distinguished name is accepted: the directory reader falls back to the
    /// entry DN before this point, so an empty value here is the directory's
    /// own data and is synced as-is.
    pub fn validate(&self) -> Result<(), MalformedRecordError> {
        if self.directory_id.trim().is_empty() {
            return Err(MalformedRecordError::missing(
                "directory_id",
                None,
                non_empty(&self.account_name),
            ));
        }

        if self.account_name.trim().is_empty() {
            return Err(MalformedRecordError::missing(
                "account_name",
                Some(self.directory_id.clone()),
                None,
            ));
        }

        Ok(())
    }

    /// Display name when present and non-blank.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Description when present and non-blank.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|s| !s.trim().is_empty())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A directory entry that cannot be reconciled.
///
/// Carries whatever identifying data the entry had so operators can find it
/// in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed directory record ({}): {reason}", self.locator())]
pub struct MalformedRecordError {
    /// Directory identifier, if the entry had one.
    pub directory_id: Option<String>,
    /// Account name, if the entry had one.
    pub account_name: Option<String>,
    /// Distinguished name of the entry, if known.
    pub distinguished_name: Option<String>,
    /// What is wrong with the entry.
    pub reason: String,
}

impl MalformedRecordError {
    /// Create an error for an entry.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            directory_id: None,
            account_name: None,
            distinguished_name: None,
            reason: reason.into(),
        }
    }

    /// Error for a missing mandatory attribute.
    #[must_use]
    pub fn missing(
        attribute: &str,
        directory_id: Option<String>,
        account_name: Option<String>,
    ) -> Self {
        Self {
            directory_id,
            account_name,
            distinguished_name: None,
            reason: format!("missing mandatory attribute '{attribute}'"),
        }
    }

    /// Attach the entry's distinguished name.
    #[must_use]
    pub fn with_distinguished_name(mut self, dn: impl Into<String>) -> Self {
        let dn = dn.into();
        if !dn.is_empty() {
            self.distinguished_name = Some(dn);
        }
        self
    }

    fn locator(&self) -> String {
        let mut parts = Vec::new();
        if let Some(id) = &self.directory_id {
            parts.push(format!("directory_id={id}"));
        }
        if let Some(name) = &self.account_name {
            parts.push(format!("account_name={name}"));
        }
        if let Some(dn) = &self.distinguished_name {
            parts.push(format!("dn={dn}"));
        }
        if parts.is_empty() {
            "unidentified entry".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let record = DirectoryGroupRecord::new("g1", "eng", "CN=Engineering,OU=Groups")
            .with_display_name("Engineering");
        assert!(record.validate().is_ok());
        assert_eq!(record.display_name(), Some("Engineering"));
        assert_eq!(record.description(), None);
    }

    #[test]
    fn test_missing_directory_id() {
        let record = DirectoryGroupRecord::new("  ", "eng", "CN=Engineering");
        let err = record.validate().unwrap_err();
        assert_eq!(err.directory_id, None);
        assert_eq!(err.account_name.as_deref(), Some("eng"));
        assert!(err.reason.contains("directory_id"));
    }

    #[test]
    fn test_missing_account_name_keeps_id() {
        let record = DirectoryGroupRecord::new("g1", "", "CN=Engineering");
        let err = record.validate().unwrap_err();
        assert_eq!(err.directory_id.as_deref(), Some("g1"));
        assert!(err.to_string().contains("directory_id=g1"));
    }

    #[test]
    fn test_blank_optional_fields_are_treated_as_absent() {
        let record = DirectoryGroupRecord::new("g1", "eng", "CN=E")
            .with_display_name(" ")
            .with_description("");
        assert_eq!(record.display_name(), None);
        assert_eq!(record.description(), None);
    }

    #[test]
    fn test_error_without_identifiers() {
        let err = MalformedRecordError::new("no attributes");
        assert_eq!(
            err.to_string(),
            "malformed directory record (unidentified entry): no attributes"
        );
    }

    #[test]
    fn test_record_deserializes_without_optionals() {
        let record: DirectoryGroupRecord = serde_json::from_str(
            r#"{"directory_id":"g1","account_name":"eng","distinguished_name":"CN=E"}"#,
        )
        .unwrap();
        assert_eq!(record.display_name, None);
        assert_eq!(record.description, None);
    }
}
