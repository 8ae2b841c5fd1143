//! Group entry mapping.
//!
//! Maps directory group entries to [`DirectoryGroupRecord`]s:
//! - id attribute (objectGUID by default) → `directory_id` (binary ids are
//!   always base64, whether the client returned them as bytes or as text)
//! - account attribute (sAMAccountName by default, then cn) → `account_name`
//! - displayName → `display_name` (absent means the title falls back to the
//!   account name)
//! - description → `description`
//! - distinguishedName, then the entry DN → `distinguished_name`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use dirsync_core::{DirectoryGroupRecord, MalformedRecordError};

use crate::attributes::{AttributeSet, AttributeValue, DN_ATTRIBUTE};
use crate::config::LdapConfig;

/// Build the LDAP attribute list for group snapshot queries.
#[must_use]
pub fn group_sync_attributes(config: &LdapConfig) -> Vec<String> {
    let mut attrs = vec![config.id_attribute.clone()];
    for name in [
        config.account_attribute.as_str(),
        "cn",
        "displayName",
        "description",
        "distinguishedName",
    ] {
        if !attrs.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            attrs.push(name.to_string());
        }
    }
    attrs
}

/// Map a directory group entry to a [`DirectoryGroupRecord`].
///
/// Returns [`MalformedRecordError`] when the entry has no identifier or no
/// account name. The error keeps whatever identifying data the entry had.
pub fn map_directory_group(
    entry: &AttributeSet,
    config: &LdapConfig,
) -> Result<DirectoryGroupRecord, MalformedRecordError> {
    let dn = entry
        .get_string("distinguishedName")
        .or_else(|| entry.get_string(DN_ATTRIBUTE))
        .unwrap_or("")
        .to_string();

    let directory_id = extract_group_id(entry, config);
    let account_name = entry
        .get_string(&config.account_attribute)
        .or_else(|| entry.get_string("cn"))
        .map(str::to_string);

    let Some(directory_id) = directory_id else {
        return Err(
            MalformedRecordError::missing(&config.id_attribute, None, account_name)
                .with_distinguished_name(dn),
        );
    };

    let Some(account_name) = account_name else {
        return Err(MalformedRecordError::missing(
            &config.account_attribute,
            Some(directory_id),
            None,
        )
        .with_distinguished_name(dn));
    };

    let mut record = DirectoryGroupRecord::new(directory_id, account_name, dn);
    if let Some(display_name) = entry.get_string("displayName") {
        record = record.with_display_name(display_name);
    }
    if let Some(description) = entry.get_string("description") {
        record = record.with_description(description);
    }

    record.validate()?;
    Ok(record)
}

fn extract_group_id(entry: &AttributeSet, config: &LdapConfig) -> Option<String> {
    let value = entry.get(&config.id_attribute)?;
    if config.id_attribute_binary {
        return binary_id_bytes(value).map(|bytes| STANDARD.encode(bytes));
    }

    match value {
        AttributeValue::Binary(bytes) if !bytes.is_empty() => Some(STANDARD.encode(bytes)),
        value => value
            .first_string()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
    }
}

/// Raw bytes of a binary identifier. The LDAP client only keeps values as
/// bytes when they are not valid UTF-8, so a GUID can also arrive as text.
fn binary_id_bytes(value: &AttributeValue) -> Option<&[u8]> {
    let bytes = match value {
        AttributeValue::Binary(bytes) => bytes.as_slice(),
        AttributeValue::String(s) => s.as_bytes(),
        AttributeValue::Array(values) => return values.first().and_then(binary_id_bytes),
    };
    (!bytes.is_empty()).then_some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use ldap3::SearchEntry;

    fn config() -> LdapConfig {
        LdapConfig::new("dc1.corp.example.com", "DC=corp,DC=example,DC=com", "CN=reader")
    }

    fn sample_group_entry() -> AttributeSet {
        AttributeSet::new()
            .with(
                "objectGUID",
                AttributeValue::Binary(vec![
                    0x5a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f, 0x60, 0x71, 0x82, 0x93, 0xa4, 0xb5, 0xc6,
                    0xd7, 0xe8, 0xf9,
                ]),
            )
            .with("dn", "CN=Engineering,OU=Groups,DC=corp,DC=example,DC=com")
            .with(
                "distinguishedName",
                "CN=Engineering,OU=Groups,DC=corp,DC=example,DC=com",
            )
            .with("sAMAccountName", "eng")
            .with("cn", "Engineering")
            .with("displayName", "Engineering Team")
            .with("description", "All engineers")
    }

    #[test]
    fn test_map_group_basic_attributes() {
        let record = map_directory_group(&sample_group_entry(), &config()).unwrap();
        assert_eq!(record.account_name, "eng");
        assert_eq!(record.display_name(), Some("Engineering Team"));
        assert_eq!(record.description(), Some("All engineers"));
        assert_eq!(
            record.distinguished_name,
            "CN=Engineering,OU=Groups,DC=corp,DC=example,DC=com"
        );
    }

    #[test]
    fn test_map_group_objectguid_is_base64() {
        let record = map_directory_group(&sample_group_entry(), &config()).unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode([
            0x5a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f, 0x60, 0x71, 0x82, 0x93, 0xa4, 0xb5, 0xc6, 0xd7,
            0xe8, 0xf9,
        ]);
        assert_eq!(record.directory_id, expected);
    }

    #[test]
    fn test_map_group_objectguid_decoded_as_text_is_base64() {
        // Valid UTF-8 bytes land in `attrs` rather than `bin_attrs`.
        let guid: Vec<u8> = vec![
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x08, 0x19, 0x2a, 0x3b, 0x4c, 0x5d,
            0x6e, 0x7f,
        ];
        let entry = SearchEntry {
            dn: "CN=Engineering,OU=Groups".to_string(),
            attrs: HashMap::from([
                (
                    "objectGUID".to_string(),
                    vec![String::from_utf8(guid.clone()).unwrap()],
                ),
                ("sAMAccountName".to_string(), vec!["eng".to_string()]),
            ]),
            bin_attrs: HashMap::new(),
        };

        let record = map_directory_group(&AttributeSet::from(entry), &config()).unwrap();
        assert_eq!(record.directory_id, "ABEiM0RVZncIGSo7TF1ufw==");
        assert_eq!(record.directory_id, STANDARD.encode(&guid));
        assert!(!record.directory_id.contains('\0'));
    }

    #[test]
    fn test_map_group_objectguid_text_and_bytes_agree() {
        let guid = vec![0x41; 16];
        let as_text = AttributeSet::new()
            .with("objectGUID", String::from_utf8(guid.clone()).unwrap())
            .with("sAMAccountName", "eng");
        let as_bytes = AttributeSet::new()
            .with("objectGUID", AttributeValue::Binary(guid))
            .with("sAMAccountName", "eng");

        let text_id = map_directory_group(&as_text, &config()).unwrap().directory_id;
        let bytes_id = map_directory_group(&as_bytes, &config()).unwrap().directory_id;
        assert_eq!(text_id, bytes_id);
    }

    #[test]
    fn test_map_group_string_id() {
        let entry = AttributeSet::new()
            .with("entryUUID", "4f1c2a9e-0000-4000-8000-000000000001")
            .with("dn", "cn=ops,ou=groups,dc=example,dc=com")
            .with("cn", "ops");
        let record = map_directory_group(&entry, &config().for_openldap()).unwrap();
        assert_eq!(record.directory_id, "4f1c2a9e-0000-4000-8000-000000000001");
        assert_eq!(record.account_name, "ops");
        assert_eq!(record.distinguished_name, "cn=ops,ou=groups,dc=example,dc=com");
    }

    #[test]
    fn test_map_group_falls_back_to_cn() {
        let entry = AttributeSet::new()
            .with("objectGUID", AttributeValue::Binary(vec![0x01; 16]))
            .with("dn", "CN=svc-sync,OU=Groups")
            .with("cn", "svc-sync");
        let record = map_directory_group(&entry, &config()).unwrap();
        assert_eq!(record.account_name, "svc-sync");
        assert_eq!(record.display_name(), None);
        assert_eq!(record.description(), None);
    }

    #[test]
    fn test_map_group_dn_falls_back_to_entry_dn() {
        let entry = AttributeSet::new()
            .with("objectGUID", AttributeValue::Binary(vec![0x02; 16]))
            .with("dn", "CN=Ops,OU=Groups")
            .with("sAMAccountName", "ops");
        let record = map_directory_group(&entry, &config()).unwrap();
        assert_eq!(record.distinguished_name, "CN=Ops,OU=Groups");
    }

    #[test]
    fn test_map_group_missing_objectguid() {
        let entry = AttributeSet::new()
            .with("dn", "CN=Orphan,OU=Groups")
            .with("sAMAccountName", "orphan");
        let err = map_directory_group(&entry, &config()).unwrap_err();
        assert_eq!(err.directory_id, None);
        assert_eq!(err.account_name.as_deref(), Some("orphan"));
        assert_eq!(err.distinguished_name.as_deref(), Some("CN=Orphan,OU=Groups"));
        assert!(err.reason.contains("objectGUID"));
    }

    #[test]
    fn test_map_group_missing_account_name_keeps_id() {
        let entry = AttributeSet::new()
            .with("objectGUID", AttributeValue::Binary(vec![0x03; 16]))
            .with("dn", "OU=Weird");
        let err = map_directory_group(&entry, &config()).unwrap_err();
        assert!(err.directory_id.is_some());
        assert!(err.reason.contains("sAMAccountName"));
    }

    #[test]
    fn test_map_group_empty_binary_id_is_missing() {
        let entry = AttributeSet::new()
            .with("objectGUID", AttributeValue::Binary(Vec::new()))
            .with("sAMAccountName", "eng");
        assert!(map_directory_group(&entry, &config()).is_err());
    }

    #[test]
    fn test_group_sync_attributes_list() {
        let attrs = group_sync_attributes(&config());
        assert_eq!(attrs[0], "objectGUID");
        assert!(attrs.contains(&"sAMAccountName".to_string()));
        assert!(attrs.contains(&"distinguishedName".to_string()));

        let attrs = group_sync_attributes(&config().for_openldap());
        assert_eq!(attrs.iter().filter(|a| a.as_str() == "cn").count(), 1);
    }
}
