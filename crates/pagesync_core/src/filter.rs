//! Removal of server-authoritative fields from page records.
//!
//! The same [`EXCLUDED_FIELDS`] set feeds both the metadata written during
//! reload and the two sides of the deploy comparison, so the two workflows
//! cannot disagree about which fields count as user content.

use serde_json::{Map, Value};

/// A raw page object as the remote service returns it.
pub type PageRecord = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const TITLE_FIELD: &str = "title";
pub const SUMMARY_FIELD: &str = "summary";
pub const SCRIPT_FIELD: &str = "script";

/// Fields owned by the server. They never appear in an update payload and
/// never take part in change detection.
pub const EXCLUDED_FIELDS: &[&str] = &[
    ID_FIELD,
    "createdAt",
    "updatedAt",
    "likedCount",
    "userId",
    "user",
    "isPublic",
    "eyeCatchingImage",
    "eyeCatchingImageId",
    "attachedFiles",
    "isLiked",
];

/// Copy of `record` without [`EXCLUDED_FIELDS`] and without `extra_keys`.
/// Keys that are not present are skipped.
pub fn strip(record: &PageRecord, extra_keys: &[&str]) -> PageRecord {
    record
        .iter()
        .filter(|(key, _)| !is_excluded(key, extra_keys))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn is_excluded(key: &str, extra_keys: &[&str]) -> bool {
    EXCLUDED_FIELDS.contains(&key) || extra_keys.contains(&key)
}
