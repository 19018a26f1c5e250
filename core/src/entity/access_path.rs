use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub static USER_ACCESS_PATH_SCHEMA: TableSchema = TableSchema {
    table: "user_access_paths",
    conflict_constraint: "user_access_paths_pk",
    columns: &[
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("location_id").keep(),
        ColumnSpec::data("access_path"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// Grants a user visibility of a location. The live set of paths for a user is replaced
/// wholesale whenever the user is written with at least one path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAccessPath {
    pub user_id: String,
    pub location_id: String,
    pub access_path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(UserAccessPath, USER_ACCESS_PATH_SCHEMA, {
    "user_id" => user_id,
    "location_id" => location_id,
    "access_path" => access_path,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl UserAccessPath {
    pub fn new(user_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), location_id: location_id.into(), ..Default::default() }
    }
}
