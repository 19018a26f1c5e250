use crate::{
    database::{FieldMap, InternalError, TableSchema},
    entity::{
        EnrollmentStatusHistory, Parent, SchoolAdmin, Student, StudentParent, Teacher, User,
        UserAccessPath, UserAddress, UserPhoneNumber, PARENT_SCHEMA, SCHOOL_ADMIN_SCHEMA,
        STUDENT_SCHEMA, TEACHER_SCHEMA, USER_GROUP_PARENT, USER_GROUP_SCHOOL_ADMIN,
        USER_GROUP_STUDENT, USER_GROUP_TEACHER,
    },
};

/// The `users` side every aggregate shares: the account row, the locations it can reach and
/// the tenant-defined groups it belongs to. `user.user_id` is the aggregate's identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainUser {
    pub user: User,
    pub access_paths: Vec<UserAccessPath>,
    pub user_group_ids: Vec<String>,
}

impl DomainUser {
    pub fn new(user: User) -> Self {
        Self { user, ..Default::default() }
    }

    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        let path = UserAccessPath::new(self.user.user_id.clone(), location_id);
        self.access_paths.push(path);
        self
    }

    pub fn with_user_group(mut self, user_group_id: impl Into<String>) -> Self {
        self.user_group_ids.push(user_group_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainStudent {
    pub profile: DomainUser,
    pub student: Student,
    pub enrollment_status_histories: Vec<EnrollmentStatusHistory>,
    pub phone_numbers: Vec<UserPhoneNumber>,
    pub addresses: Vec<UserAddress>,
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainParent {
    pub profile: DomainUser,
    pub parent: Parent,
    pub phone_numbers: Vec<UserPhoneNumber>,
    /// Students this parent is linked to. `parent_id` is filled from the aggregate.
    pub children: Vec<StudentParent>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSchoolAdmin {
    pub profile: DomainUser,
    pub school_admin: SchoolAdmin,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainTeacher {
    pub profile: DomainUser,
    pub teacher: Teacher,
}

/// Kind of user account an aggregate persists, as carried in `users.user_group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Student,
    Parent,
    SchoolAdmin,
    Teacher,
}

impl AggregateKind {
    pub fn user_group(&self) -> &'static str {
        match self {
            AggregateKind::Student => USER_GROUP_STUDENT,
            AggregateKind::Parent => USER_GROUP_PARENT,
            AggregateKind::SchoolAdmin => USER_GROUP_SCHOOL_ADMIN,
            AggregateKind::Teacher => USER_GROUP_TEACHER,
        }
    }

    /// Name of the orchestrator, used as the outermost step label.
    pub fn repo_name(&self) -> &'static str {
        match self {
            AggregateKind::Student => "StudentRepo",
            AggregateKind::Parent => "ParentRepo",
            AggregateKind::SchoolAdmin => "SchoolAdminRepo",
            AggregateKind::Teacher => "TeacherRepo",
        }
    }
}

/// An aggregate rooted at a user account: one primary row keyed by the user id, plus the
/// shared user layer.
pub trait UserAggregate: Send + Sync {
    type Primary: FieldMap + 'static;

    const KIND: AggregateKind;

    fn profile(&self) -> &DomainUser;

    fn primary_schema() -> &'static TableSchema;

    /// Column of the primary table holding the user id.
    fn primary_key() -> &'static str;

    /// The primary row with its key taken from the aggregate's identity.
    fn primary_row(&self) -> Self::Primary;

    fn id(&self) -> &str {
        self.profile().user_id()
    }
}

impl UserAggregate for DomainStudent {
    type Primary = Student;

    const KIND: AggregateKind = AggregateKind::Student;

    fn profile(&self) -> &DomainUser {
        &self.profile
    }

    fn primary_schema() -> &'static TableSchema {
        &STUDENT_SCHEMA
    }

    fn primary_key() -> &'static str {
        "student_id"
    }

    fn primary_row(&self) -> Student {
        Student { student_id: self.id().to_string(), ..self.student.clone() }
    }
}

impl UserAggregate for DomainParent {
    type Primary = Parent;

    const KIND: AggregateKind = AggregateKind::Parent;

    fn profile(&self) -> &DomainUser {
        &self.profile
    }

    fn primary_schema() -> &'static TableSchema {
        &PARENT_SCHEMA
    }

    fn primary_key() -> &'static str {
        "parent_id"
    }

    fn primary_row(&self) -> Parent {
        Parent { parent_id: self.id().to_string(), ..self.parent.clone() }
    }
}

impl UserAggregate for DomainSchoolAdmin {
    type Primary = SchoolAdmin;

    const KIND: AggregateKind = AggregateKind::SchoolAdmin;

    fn profile(&self) -> &DomainUser {
        &self.profile
    }

    fn primary_schema() -> &'static TableSchema {
        &SCHOOL_ADMIN_SCHEMA
    }

    fn primary_key() -> &'static str {
        "school_admin_id"
    }

    fn primary_row(&self) -> SchoolAdmin {
        SchoolAdmin { school_admin_id: self.id().to_string(), ..self.school_admin.clone() }
    }
}

impl UserAggregate for DomainTeacher {
    type Primary = Teacher;

    const KIND: AggregateKind = AggregateKind::Teacher;

    fn profile(&self) -> &DomainUser {
        &self.profile
    }

    fn primary_schema() -> &'static TableSchema {
        &TEACHER_SCHEMA
    }

    fn primary_key() -> &'static str {
        "teacher_id"
    }

    fn primary_row(&self) -> Teacher {
        Teacher { teacher_id: self.id().to_string(), ..self.teacher.clone() }
    }
}

/// Ids of `aggregates` in order. Every aggregate must carry one.
pub fn aggregate_ids<A: UserAggregate>(aggregates: &[A]) -> Result<Vec<String>, InternalError> {
    aggregates
        .iter()
        .enumerate()
        .map(|(index, aggregate)| {
            if aggregate.id().trim().is_empty() {
                Err(InternalError::Validation(format!(
                    "{} {} has an empty user id",
                    A::KIND.repo_name(),
                    index
                )))
            } else {
                Ok(aggregate.id().to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_row_takes_aggregate_id() {
        let student = DomainStudent {
            profile: DomainUser::new(User::new("s1", USER_GROUP_STUDENT)),
            student: Student { student_id: "stale".to_string(), ..Default::default() },
            ..Default::default()
        };

        assert_eq!(student.primary_row().student_id, "s1");
        assert_eq!(DomainStudent::primary_schema().table, "students");
    }

    #[test]
    fn test_aggregate_ids_rejects_empty_id() {
        let teachers = vec![
            DomainTeacher { profile: DomainUser::new(User::new("t1", USER_GROUP_TEACHER)), ..Default::default() },
            DomainTeacher::default(),
        ];

        let err = aggregate_ids(&teachers).unwrap_err();
        assert_eq!(err.to_string(), "TeacherRepo 1 has an empty user id");
        assert_eq!(aggregate_ids(&teachers[..1]).unwrap(), vec!["t1"]);
    }

    #[test]
    fn test_domain_user_builders() {
        let profile = DomainUser::new(User::new("u1", USER_GROUP_PARENT))
            .with_location("loc-1")
            .with_user_group("g1");

        assert_eq!(profile.access_paths[0].user_id, "u1");
        assert_eq!(profile.access_paths[0].location_id, "loc-1");
        assert_eq!(profile.user_group_ids, vec!["g1"]);
    }
}
