use std::{fs, path::Path};

use chrono::{DateTime, NaiveDate, Utc};
use rosterstore::{
    aggregate::{DomainParent, DomainStudent, DomainUser},
    entity::{
        EnrollmentStatusHistory, Parent, Student, StudentParent, User, UserAddress,
        UserPhoneNumber, ADDRESS_TYPE_HOME, PHONE_TYPE_PRIMARY,
    },
};
use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum ReadInputError {
    #[error("Could not read input file: {0}")]
    CouldNotReadFile(#[from] std::io::Error),

    #[error("Could not parse input file: {0}")]
    CouldNotParse(#[from] serde_yaml::Error),
}

/// An input file: lists of students and parents to persist.
#[derive(Debug, Default, Deserialize)]
pub struct InputFile {
    #[serde(default)]
    pub students: Vec<StudentInput>,

    #[serde(default)]
    pub parents: Vec<ParentInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
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
    pub country: Option<String>,
    pub external_id: Option<String>,

    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default)]
    pub user_groups: Vec<String>,
}

impl UserInput {
    fn into_domain(self) -> DomainUser {
        let user = User {
            user_id: self.user_id,
            name: self.name,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            username: self.username,
            login_email: self.login_email,
            phone_number: self.phone_number,
            gender: self.gender,
            birthday: self.birthday,
            country: self.country,
            user_external_id: self.external_id,
            ..Default::default()
        };

        let profile = self.locations.into_iter().fold(DomainUser::new(user), DomainUser::with_location);
        self.user_groups.into_iter().fold(profile, DomainUser::with_user_group)
    }
}

#[derive(Debug, Deserialize)]
pub struct PhoneInput {
    pub number: String,

    #[serde(rename = "type", default = "default_phone_type")]
    pub phone_type: String,
}

fn default_phone_type() -> String {
    PHONE_TYPE_PRIMARY.to_string()
}

impl From<PhoneInput> for UserPhoneNumber {
    fn from(input: PhoneInput) -> Self {
        UserPhoneNumber::new(input.number, &input.phone_type)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressInput {
    pub postal_code: Option<String>,
    pub prefecture_id: Option<String>,
    pub city: Option<String>,
    pub first_street: Option<String>,
    pub second_street: Option<String>,
}

impl From<AddressInput> for UserAddress {
    fn from(input: AddressInput) -> Self {
        UserAddress {
            address_type: Some(ADDRESS_TYPE_HOME.to_string()),
            postal_code: input.postal_code,
            prefecture_id: input.prefecture_id,
            city: input.city,
            first_street: input.first_street,
            second_street: input.second_street,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentInput {
    pub location_id: String,
    pub enrollment_status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<EnrollmentInput> for EnrollmentStatusHistory {
    fn from(input: EnrollmentInput) -> Self {
        EnrollmentStatusHistory {
            end_date: input.end_date,
            ..EnrollmentStatusHistory::new(input.location_id, input.enrollment_status, input.start_date)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StudentInput {
    #[serde(flatten)]
    pub user: UserInput,
    pub current_grade: Option<i32>,
    pub grade_id: Option<String>,
    pub enrollment_status: Option<String>,
    pub student_note: Option<String>,
    pub contact_preference: Option<String>,
    pub school_id: Option<i32>,

    #[serde(default)]
    pub enrollment_status_histories: Vec<EnrollmentInput>,

    #[serde(default)]
    pub phone_numbers: Vec<PhoneInput>,

    #[serde(default)]
    pub addresses: Vec<AddressInput>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<StudentInput> for DomainStudent {
    fn from(input: StudentInput) -> Self {
        let student_external_id = input.user.external_id.clone();
        DomainStudent {
            profile: input.user.into_domain(),
            student: Student {
                current_grade: input.current_grade,
                grade_id: input.grade_id,
                enrollment_status: input.enrollment_status,
                student_external_id,
                student_note: input.student_note,
                contact_preference: input.contact_preference,
                school_id: input.school_id,
                ..Default::default()
            },
            enrollment_status_histories: input.enrollment_status_histories.into_iter().map(Into::into).collect(),
            phone_numbers: input.phone_numbers.into_iter().map(Into::into).collect(),
            addresses: input.addresses.into_iter().map(Into::into).collect(),
            tag_ids: input.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChildInput {
    pub student_id: String,
    pub relationship: String,
}

#[derive(Debug, Deserialize)]
pub struct ParentInput {
    #[serde(flatten)]
    pub user: UserInput,
    pub school_id: Option<i32>,

    #[serde(default)]
    pub phone_numbers: Vec<PhoneInput>,

    #[serde(default)]
    pub children: Vec<ChildInput>,
}

impl From<ParentInput> for DomainParent {
    fn from(input: ParentInput) -> Self {
        DomainParent {
            profile: input.user.into_domain(),
            parent: Parent { school_id: input.school_id, ..Default::default() },
            phone_numbers: input.phone_numbers.into_iter().map(Into::into).collect(),
            children: input
                .children
                .into_iter()
                .map(|child| StudentParent::new(child.student_id, &child.relationship))
                .collect(),
        }
    }
}

impl InputFile {
    pub fn parse(contents: &str) -> Result<Self, ReadInputError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn read(path: &Path) -> Result<Self, ReadInputError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn into_aggregates(self) -> (Vec<DomainStudent>, Vec<DomainParent>) {
        (
            self.students.into_iter().map(Into::into).collect(),
            self.parents.into_iter().map(Into::into).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"
students:
  - user_id: s1
    name: Aiko Tanaka
    email: aiko@example.com
    birthday: 2012-05-01
    locations: [loc-1]
    current_grade: 5
    enrollment_status: STUDENT_ENROLLMENT_STATUS_ENROLLED
    enrollment_status_histories:
      - location_id: loc-1
        enrollment_status: STUDENT_ENROLLMENT_STATUS_ENROLLED
        start_date: 2024-04-01T00:00:00Z
    phone_numbers:
      - number: "0123"
    addresses:
      - city: Tokyo
    tags: [tag-1]
parents:
  - user_id: p1
    name: Ken Tanaka
    children:
      - student_id: s1
        relationship: FAMILY_RELATIONSHIP_FATHER
"#;

    #[test]
    fn test_parse_input_into_aggregates() {
        let (students, parents) = InputFile::parse(INPUT).unwrap().into_aggregates();

        assert_eq!(students.len(), 1);
        let student = &students[0];
        assert_eq!(student.profile.user_id(), "s1");
        assert_eq!(student.profile.user.birthday, NaiveDate::from_ymd_opt(2012, 5, 1));
        assert_eq!(student.profile.access_paths[0].location_id, "loc-1");
        assert_eq!(student.student.current_grade, Some(5));
        assert_eq!(student.phone_numbers[0].phone_type.as_deref(), Some(PHONE_TYPE_PRIMARY));
        assert_eq!(student.addresses[0].city.as_deref(), Some("Tokyo"));
        assert_eq!(student.enrollment_status_histories[0].location_id, "loc-1");
        assert_eq!(student.tag_ids, vec!["tag-1"]);

        assert_eq!(parents[0].children[0].student_id, "s1");
        assert_eq!(parents[0].children[0].relationship.as_deref(), Some("FAMILY_RELATIONSHIP_FATHER"));
    }

    #[test]
    fn test_empty_input() {
        let input = InputFile::parse("{}").unwrap();
        assert!(input.students.is_empty());
        assert!(input.parents.is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            InputFile::read(Path::new("/definitely/not/here.yaml")),
            Err(ReadInputError::CouldNotReadFile(_))
        ));
    }
}
