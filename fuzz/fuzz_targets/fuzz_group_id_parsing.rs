//! Fuzz target for local identifier parsing.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_group_id_parsing -- -max_total_time=600

#![no_main]

use dirsync_core::{GroupId, MappingId};
use libfuzzer_sys::fuzz_target;
use uuid::Uuid;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(id) = s.parse::<GroupId>() {
            let reparsed: GroupId = id.to_string().parse().unwrap();
            assert_eq!(id, reparsed);
        }
        let _ = s.parse::<MappingId>();
    }

    if data.len() == 16 {
        let uuid = Uuid::from_slice(data).unwrap();
        let id = GroupId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }
});
