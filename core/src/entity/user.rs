use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    database::{query_builder::build_update_set_clause, ColumnSpec, TableSchema},
    impl_field_map,
    options::UpsertOptions,
};

pub const USER_GROUP_STUDENT: &str = "USER_GROUP_STUDENT";
pub const USER_GROUP_PARENT: &str = "USER_GROUP_PARENT";
pub const USER_GROUP_SCHOOL_ADMIN: &str = "USER_GROUP_SCHOOL_ADMIN";
pub const USER_GROUP_TEACHER: &str = "USER_GROUP_TEACHER";

fn username_login_enabled(options: &UpsertOptions) -> bool {
    options.enable_username
}

fn email_updatable(options: &UpsertOptions) -> bool {
    !options.enable_ignore_update_email
}

pub static USER_SCHEMA: TableSchema = TableSchema {
    table: "users",
    conflict_constraint: "users_pk",
    columns: &[
        ColumnSpec::data("user_id").keep(),
        ColumnSpec::data("name"),
        ColumnSpec::data("first_name"),
        ColumnSpec::data("last_name"),
        ColumnSpec::data("email").update_when(email_updatable),
        ColumnSpec::data("username").update_when(username_login_enabled),
        ColumnSpec::data("login_email").update_when(username_login_enabled),
        ColumnSpec::data("phone_number"),
        ColumnSpec::data("gender"),
        ColumnSpec::data("birthday"),
        ColumnSpec::data("user_group"),
        ColumnSpec::data("country"),
        ColumnSpec::data("user_external_id"),
        ColumnSpec::data("deactivated_at"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// Row of `users`, shared by every aggregate kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub user_id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub login_email: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub user_group: Option<String>,
    pub country: Option<String>,
    pub user_external_id: Option<String>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(User, USER_SCHEMA, {
    "user_id" => user_id,
    "name" => name,
    "first_name" => first_name,
    "last_name" => last_name,
    "email" => email,
    "username" => username,
    "login_email" => login_email,
    "phone_number" => phone_number,
    "gender" => gender,
    "birthday" => birthday,
    "user_group" => user_group,
    "country" => country,
    "user_external_id" => user_external_id,
    "deactivated_at" => deactivated_at,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl User {
    pub fn new(user_id: impl Into<String>, user_group: &str) -> Self {
        Self {
            user_id: user_id.into(),
            user_group: Some(user_group.to_string()),
            ..Default::default()
        }
    }

    /// Login email falls back to the contact email when username login is disabled.
    pub fn effective_login_email(&self, options: &UpsertOptions) -> Option<String> {
        if options.enable_username {
            self.login_email.clone()
        } else {
            self.login_email.clone().or_else(|| self.email.clone())
        }
    }
}

/// Update clause for a `users` upsert over `columns`. `created_at` is never overwritten, and
/// neither are `username` and `login_email` unless username login is enabled.
pub fn build_user_update_set_clause(columns: &[&str], enable_username: bool) -> String {
    let options = UpsertOptions { enable_username, ..Default::default() };
    build_update_set_clause(columns, &USER_SCHEMA.excluded_from_update(&options))
}
