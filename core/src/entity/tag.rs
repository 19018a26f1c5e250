use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub static TAGGED_USER_SCHEMA: TableSchema = TableSchema {
    table: "tagged_user",
    conflict_constraint: "pk__tagged_user",
    columns: &[
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("tag_id").keep(),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggedUser {
    pub user_id: String,
    pub tag_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(TaggedUser, TAGGED_USER_SCHEMA, {
    "user_id" => user_id,
    "tag_id" => tag_id,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl TaggedUser {
    pub fn new(user_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), tag_id: tag_id.into(), ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::FieldMap;

    #[test]
    fn test_field_names_follow_schema() {
        assert_eq!(TaggedUser::default().field_names(), TAGGED_USER_SCHEMA.column_names());
    }
}
