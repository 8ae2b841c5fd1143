//! Field sync from a directory record onto a local group.

use chrono::{DateTime, Utc};

use dirsync_core::{DirectoryGroupRecord, Group};

/// Copy a record's attributes onto `group` and mark it directory-managed.
///
/// - `code` is the account name
/// - `title` is the display name, or the account name when that is blank
/// - `description` is only overwritten by a non-blank value
/// - `distinguished_name` is always overwritten
///
/// Returns whether any attribute other than `last_synced_at` changed.
pub fn apply_record(group: &mut Group, record: &DirectoryGroupRecord, now: DateTime<Utc>) -> bool {
    let before = (
        group.code.clone(),
        group.title.clone(),
        group.description.clone(),
        group.distinguished_name.clone(),
        group.is_directory_managed,
    );

    group.code = record.account_name.clone();
    group.title = record
        .display_name()
        .unwrap_or(&record.account_name)
        .to_string();
    if let Some(description) = record.description() {
        group.description = Some(description.to_string());
    }
    group.distinguished_name = Some(record.distinguished_name.clone());
    group.directory_id = Some(record.directory_id.clone());
    group.last_synced_at = Some(now);
    group.is_directory_managed = true;

    before
        != (
            group.code.clone(),
            group.title.clone(),
            group.description.clone(),
            group.distinguished_name.clone(),
            group.is_directory_managed,
        )
}
