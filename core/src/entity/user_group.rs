use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub const USER_GROUP_STATUS_ACTIVE: &str = "USER_GROUP_STATUS_ACTIVE";

pub static LEGACY_USER_GROUP_SCHEMA: TableSchema = TableSchema {
    table: "users_groups",
    conflict_constraint: "users_groups_pk",
    columns: &[
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("group_id").keep(),
        ColumnSpec::data("is_origin"),
        ColumnSpec::data("status"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// Membership of a user in one of the fixed role groups (`USER_GROUP_STUDENT`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyUserGroup {
    pub user_id: String,
    pub group_id: String,
    pub is_origin: bool,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(LegacyUserGroup, LEGACY_USER_GROUP_SCHEMA, {
    "user_id" => user_id,
    "group_id" => group_id,
    "is_origin" => is_origin,
    "status" => status,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl LegacyUserGroup {
    /// The active, originating group of a freshly written user.
    pub fn origin(user_id: impl Into<String>, group_id: &str) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: group_id.to_string(),
            is_origin: true,
            status: USER_GROUP_STATUS_ACTIVE.to_string(),
            ..Default::default()
        }
    }
}

pub static USER_GROUP_MEMBER_SCHEMA: TableSchema = TableSchema {
    table: "user_group_member",
    conflict_constraint: "user_group_member_pk",
    columns: &[
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("user_group_id").keep(),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// Membership of a user in a tenant-defined user group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserGroupMember {
    pub user_id: String,
    pub user_group_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(UserGroupMember, USER_GROUP_MEMBER_SCHEMA, {
    "user_id" => user_id,
    "user_group_id" => user_group_id,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl UserGroupMember {
    pub fn new(user_id: impl Into<String>, user_group_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), user_group_id: user_group_id.into(), ..Default::default() }
    }
}
