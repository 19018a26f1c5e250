use serde::{Deserialize, Serialize};

/// Per-call feature switches that change which columns an upsert overwrites and which write
/// path enrollment histories take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOptions {
    /// Username login is enabled for the tenant, so `username` and `login_email` are owned by
    /// the caller and overwritten on conflict.
    #[serde(default)]
    pub enable_username: bool,

    /// Leave a stored `email` untouched when an existing user is upserted.
    #[serde(default)]
    pub enable_ignore_update_email: bool,

    /// Write enrollment status histories with a single multi-row insert instead of one upsert
    /// per row.
    #[serde(default)]
    pub bulk_insert_enrollment_status_histories: bool,
}
