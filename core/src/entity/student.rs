use chrono::{DateTime, Utc};

use crate::{
    database::{ColumnSpec, TableSchema},
    impl_field_map,
};

pub const STUDENT_ENROLLMENT_STATUS_ENROLLED: &str = "STUDENT_ENROLLMENT_STATUS_ENROLLED";
pub const STUDENT_ENROLLMENT_STATUS_POTENTIAL: &str = "STUDENT_ENROLLMENT_STATUS_POTENTIAL";
pub const STUDENT_ENROLLMENT_STATUS_WITHDRAWN: &str = "STUDENT_ENROLLMENT_STATUS_WITHDRAWN";

pub static STUDENT_SCHEMA: TableSchema = TableSchema {
    table: "students",
    conflict_constraint: "students_pk",
    columns: &[
        ColumnSpec::data("student_id").keep(),
        ColumnSpec::data("current_grade"),
        ColumnSpec::data("grade_id"),
        // owned by the enrollment status histories once set, so an empty value never
        // overwrites it
        ColumnSpec::data("enrollment_status").omit_when_empty(),
        ColumnSpec::data("student_external_id"),
        ColumnSpec::data("student_note"),
        ColumnSpec::data("contact_preference"),
        ColumnSpec::data("school_id"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Student {
    pub student_id: String,
    pub current_grade: Option<i32>,
    pub grade_id: Option<String>,
    pub enrollment_status: Option<String>,
    pub student_external_id: Option<String>,
    pub student_note: Option<String>,
    pub contact_preference: Option<String>,
    pub school_id: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(Student, STUDENT_SCHEMA, {
    "student_id" => student_id,
    "current_grade" => current_grade,
    "grade_id" => grade_id,
    "enrollment_status" => enrollment_status,
    "student_external_id" => student_external_id,
    "student_note" => student_note,
    "contact_preference" => contact_preference,
    "school_id" => school_id,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

pub static ENROLLMENT_STATUS_HISTORY_SCHEMA: TableSchema = TableSchema {
    table: "student_enrollment_status_history",
    conflict_constraint: "pk__student_enrollment_status_history",
    columns: &[
        ColumnSpec::data("student_id").keep(),
        ColumnSpec::data("location_id").keep(),
        ColumnSpec::data("enrollment_status").keep(),
        ColumnSpec::data("start_date").keep(),
        ColumnSpec::data("end_date"),
        ColumnSpec::data("order_id"),
        ColumnSpec::data("order_sequence_number"),
        ColumnSpec::CREATED_AT,
        ColumnSpec::UPDATED_AT,
        ColumnSpec::DELETED_AT,
        ColumnSpec::RESOURCE_PATH,
    ],
};

/// One period of a student's enrollment status at a location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentStatusHistory {
    pub student_id: String,
    pub location_id: String,
    pub enrollment_status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub order_id: Option<String>,
    pub order_sequence_number: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub resource_path: Option<String>,
}

impl_field_map!(EnrollmentStatusHistory, ENROLLMENT_STATUS_HISTORY_SCHEMA, {
    "student_id" => student_id,
    "location_id" => location_id,
    "enrollment_status" => enrollment_status,
    "start_date" => start_date,
    "end_date" => end_date,
    "order_id" => order_id,
    "order_sequence_number" => order_sequence_number,
    "created_at" => created_at,
    "updated_at" => updated_at,
    "deleted_at" => deleted_at,
    "resource_path" => resource_path,
});

impl EnrollmentStatusHistory {
    pub fn new(
        location_id: impl Into<String>,
        enrollment_status: impl Into<String>,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            enrollment_status: enrollment_status.into(),
            start_date: Some(start_date),
            ..Default::default()
        }
    }
}
