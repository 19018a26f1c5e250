use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub static SCHOOL_ADMIN_SCHEMA: TableSchema = TableSchema {
    table: "school_admins",
    conflict_constraint: "school_admins_pk",
    columns: &[
        ColumnSpec::data("school_admin_id").keep(),
        ColumnSpec::data("school_id"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolAdmin {
    pub school_admin_id: String,
    pub school_id: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(SchoolAdmin, SCHOOL_ADMIN_SCHEMA, {
    "school_admin_id" => school_admin_id,
    "school_id" => school_id,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

pub static TEACHER_SCHEMA: TableSchema = TableSchema {
    table: "teachers",
    conflict_constraint: "teachers_pk",
    columns: &[
        ColumnSpec::data("teacher_id").keep(),
        ColumnSpec::data("school_ids"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Teacher {
    pub teacher_id: String,
    pub school_ids: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(Teacher, TEACHER_SCHEMA, {
    "teacher_id" => teacher_id,
    "school_ids" => school_ids,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});
