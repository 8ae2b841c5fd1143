//! Fuzz target for directory entry to group record mapping.
//!
//! Arbitrary bytes are split into attribute values; the mapper must never
//! panic, and every record it accepts must pass validation.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_group_entry_mapping -- -max_total_time=600

#![no_main]

use dirsync_connector_ldap::{map_directory_group, AttributeSet, AttributeValue, LdapConfig};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 6] = [
    "dn",
    "distinguishedName",
    "sAMAccountName",
    "cn",
    "displayName",
    "description",
];

fuzz_target!(|data: &[u8]| {
    let Some((&mode, rest)) = data.split_first() else {
        return;
    };

    let config = LdapConfig::new("ldap.example.com", "dc=example,dc=com", "cn=reader");
    let mut parts = rest.split(|b| *b == 0);
    let mut entry = AttributeSet::new();

    if let Some(id) = parts.next() {
        if mode & 1 == 1 {
            entry.set("objectGUID", AttributeValue::Binary(id.to_vec()));
        } else {
            entry.set("objectGUID", String::from_utf8_lossy(id).into_owned());
        }
    }

    for (name, value) in NAMES.iter().zip(parts) {
        let value = String::from_utf8_lossy(value).into_owned();
        if mode & 2 == 2 {
            entry.set(
                name,
                AttributeValue::Array(vec![value.clone().into(), value.into()]),
            );
        } else {
            entry.set(name, value);
        }
    }

    if let Ok(record) = map_directory_group(&entry, &config) {
        assert!(record.validate().is_ok());
        assert!(!record.directory_id.trim().is_empty());
    }
});
