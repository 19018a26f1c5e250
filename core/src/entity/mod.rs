//! Row types of every table the engine writes, each paired with its static
//! [`TableSchema`](crate::database::TableSchema).

mod access_path;
mod contact;
mod parent;
mod staff;
mod student;
mod tag;
mod user;
mod user_group;

pub use access_path::{UserAccessPath, USER_ACCESS_PATH_SCHEMA};
pub use contact::{
    UserAddress, UserPhoneNumber, UsrEmail, ADDRESS_TYPE_HOME, PHONE_TYPE_PRIMARY,
    PHONE_TYPE_SECONDARY, USER_ADDRESS_SCHEMA, USER_PHONE_NUMBER_SCHEMA, USR_EMAIL_SCHEMA,
};
pub use parent::{
    Parent, StudentParent, FAMILY_RELATIONSHIP_FATHER, FAMILY_RELATIONSHIP_MOTHER,
    FAMILY_RELATIONSHIP_OTHER, PARENT_SCHEMA, STUDENT_PARENT_SCHEMA,
};
pub use staff::{SchoolAdmin, Teacher, SCHOOL_ADMIN_SCHEMA, TEACHER_SCHEMA};
pub use student::{
    EnrollmentStatusHistory, Student, ENROLLMENT_STATUS_HISTORY_SCHEMA, STUDENT_ENROLLMENT_STATUS_ENROLLED,
    STUDENT_ENROLLMENT_STATUS_POTENTIAL, STUDENT_ENROLLMENT_STATUS_WITHDRAWN, STUDENT_SCHEMA,
};
pub use tag::{TaggedUser, TAGGED_USER_SCHEMA};
pub use user::{
    build_user_update_set_clause, User, USER_GROUP_PARENT, USER_GROUP_SCHOOL_ADMIN,
    USER_GROUP_STUDENT, USER_GROUP_TEACHER, USER_SCHEMA,
};
pub use user_group::{
    LegacyUserGroup, UserGroupMember, LEGACY_USER_GROUP_SCHEMA, USER_GROUP_MEMBER_SCHEMA,
    USER_GROUP_STATUS_ACTIVE,
};

use crate::database::TableSchema;

/// Every table the engine writes to.
pub static ALL_SCHEMAS: &[&TableSchema] = &[
    &USER_SCHEMA,
    &LEGACY_USER_GROUP_SCHEMA,
    &USER_GROUP_MEMBER_SCHEMA,
    &USER_ACCESS_PATH_SCHEMA,
    &STUDENT_SCHEMA,
    &ENROLLMENT_STATUS_HISTORY_SCHEMA,
    &PARENT_SCHEMA,
    &STUDENT_PARENT_SCHEMA,
    &SCHOOL_ADMIN_SCHEMA,
    &TEACHER_SCHEMA,
    &USER_PHONE_NUMBER_SCHEMA,
    &USER_ADDRESS_SCHEMA,
    &TAGGED_USER_SCHEMA,
    &USR_EMAIL_SCHEMA,
];
