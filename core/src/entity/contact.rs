use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub const PHONE_TYPE_PRIMARY: &str = "STUDENT_PHONE_NUMBER";
pub const PHONE_TYPE_SECONDARY: &str = "STUDENT_HOME_PHONE_NUMBER";
pub const ADDRESS_TYPE_HOME: &str = "HOME_ADDRESS";

pub static USER_PHONE_NUMBER_SCHEMA: TableSchema = TableSchema {
    table: "user_phone_number",
    conflict_constraint: "user_phone_number__pk",
    columns: &[
        ColumnSpec::data("user_phone_number_id").keep(),
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("phone_number"),
        ColumnSpec::data("type"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPhoneNumber {
    pub user_phone_number_id: String,
    pub user_id: String,
    pub phone_number: Option<String>,
    pub phone_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(UserPhoneNumber, USER_PHONE_NUMBER_SCHEMA, {
    "user_phone_number_id" => user_phone_number_id,
    "user_id" => user_id,
    "phone_number" => phone_number,
    "type" => phone_type,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl UserPhoneNumber {
    pub fn new(phone_number: impl Into<String>, phone_type: &str) -> Self {
        Self {
            phone_number: Some(phone_number.into()),
            phone_type: Some(phone_type.to_string()),
            ..Default::default()
        }
    }
}

pub static USER_ADDRESS_SCHEMA: TableSchema = TableSchema {
    table: "user_address",
    conflict_constraint: "user_address__pk",
    columns: &[
        ColumnSpec::data("user_address_id").keep(),
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("address_type"),
        ColumnSpec::data("postal_code"),
        ColumnSpec::data("prefecture_id"),
        ColumnSpec::data("city"),
        ColumnSpec::data("first_street"),
        ColumnSpec::data("second_street"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAddress {
    pub user_address_id: String,
    pub user_id: String,
    pub address_type: Option<String>,
    pub postal_code: Option<String>,
    pub prefecture_id: Option<String>,
    pub city: Option<String>,
    pub first_street: Option<String>,
    pub second_street: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(UserAddress, USER_ADDRESS_SCHEMA, {
    "user_address_id" => user_address_id,
    "user_id" => user_id,
    "address_type" => address_type,
    "postal_code" => postal_code,
    "prefecture_id" => prefecture_id,
    "city" => city,
    "first_street" => first_street,
    "second_street" => second_street,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

pub static USR_EMAIL_SCHEMA: TableSchema = TableSchema {
    table: "usr_email",
    conflict_constraint: "usr_email__pkey",
    columns: &[
        // generated by the database when not supplied
        ColumnSpec::data("usr_id").keep().omit_when_empty(),
        ColumnSpec::data("email"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// Identity-provider email record. Rows are created with `RETURNING` so the generated
/// `usr_id` comes back to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsrEmail {
    pub usr_id: Option<String>,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(UsrEmail, USR_EMAIL_SCHEMA, {
    "usr_id" => usr_id,
    "email" => email,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::FieldMap;

    #[test]
    fn test_field_names_follow_schema() {
        assert_eq!(UserPhoneNumber::default().field_names(), USER_PHONE_NUMBER_SCHEMA.column_names());
        assert_eq!(UserAddress::default().field_names(), USER_ADDRESS_SCHEMA.column_names());
        assert_eq!(UsrEmail::default().field_names(), USR_EMAIL_SCHEMA.column_names());
    }
}
