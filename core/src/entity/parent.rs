use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub const FAMILY_RELATIONSHIP_FATHER: &str = "FAMILY_RELATIONSHIP_FATHER";
pub const FAMILY_RELATIONSHIP_MOTHER: &str = "FAMILY_RELATIONSHIP_MOTHER";
pub const FAMILY_RELATIONSHIP_OTHER: &str = "FAMILY_RELATIONSHIP_OTHER";

pub static PARENT_SCHEMA: TableSchema = TableSchema {
    table: "parents",
    conflict_constraint: "parents_pk",
    columns: &[
        ColumnSpec::data("parent_id").keep(),
        ColumnSpec::data("school_id"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parent {
    pub parent_id: String,
    pub school_id: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(Parent, PARENT_SCHEMA, {
    "parent_id" => parent_id,
    "school_id" => school_id,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

pub static STUDENT_PARENT_SCHEMA: TableSchema = TableSchema {
    table: "student_parents",
    conflict_constraint: "student_parents_pk",
    columns: &[
        ColumnSpec::data("student_id").keep(),
        ColumnSpec::data("parent_id").keep(),
        ColumnSpec::data("relationship"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// Link between a parent and one of their children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentParent {
    pub student_id: String,
    pub parent_id: String,
    pub relationship: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(StudentParent, STUDENT_PARENT_SCHEMA, {
    "student_id" => student_id,
    "parent_id" => parent_id,
    "relationship" => relationship,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl StudentParent {
    pub fn new(student_id: impl Into<String>, relationship: &str) -> Self {
        Self {
            student_id: student_id.into(),
            relationship: Some(relationship.to_string()),
            ..Default::default()
        }
    }
}
