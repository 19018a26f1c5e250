use std::sync::Arc;

use tracing::{error, info};

use crate::{
    aggregate::{
        domain::{DomainParent, DomainStudent},
        repo::{ParentRepo, StudentRepo},
    },
    database::{InternalError, OperationContext, QueryExecer, WrapStep},
    entity::{
        EnrollmentStatusHistory, StudentParent, TaggedUser, UserAddress, UserPhoneNumber,
    },
    helpers::generate_row_id,
    options::UpsertOptions,
    repository::{
        common::unique_ids, EnrollmentStatusHistoryRepo, EnrollmentStatusHistoryRepository,
        OwnedRowRepository, StudentParentRepo, TaggedUserRepo, UserAddressRepo,
        UserPhoneNumberRepo,
    },
};

fn phone_rows(user_id: &str, phones: &[UserPhoneNumber]) -> Vec<UserPhoneNumber> {
    phones
        .iter()
        .map(|phone| UserPhoneNumber {
            user_phone_number_id: if phone.user_phone_number_id.is_empty() {
                generate_row_id()
            } else {
                phone.user_phone_number_id.clone()
            },
            user_id: user_id.to_string(),
            ..phone.clone()
        })
        .collect()
}

/// Child rows of a set of students, keyed to their owners.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChildren {
    pub student_ids: Vec<String>,
    pub addresses: Vec<UserAddress>,
    pub phone_numbers: Vec<UserPhoneNumber>,
    pub enrollment_status_histories: Vec<EnrollmentStatusHistory>,
    pub tagged_users: Vec<TaggedUser>,
}

impl StudentChildren {
    pub fn collect(students: &[DomainStudent]) -> Result<Self, InternalError> {
        let mut children = StudentChildren { student_ids: StudentRepo::ids(students)?, ..Default::default() };

        for (student, id) in students.iter().zip(&children.student_ids) {
            children.addresses.extend(student.addresses.iter().map(|address| UserAddress {
                user_address_id: if address.user_address_id.is_empty() {
                    generate_row_id()
                } else {
                    address.user_address_id.clone()
                },
                user_id: id.clone(),
                ..address.clone()
            }));
            children.phone_numbers.extend(phone_rows(id, &student.phone_numbers));
            children.enrollment_status_histories.extend(
                student
                    .enrollment_status_histories
                    .iter()
                    .map(|history| EnrollmentStatusHistory { student_id: id.clone(), ..history.clone() }),
            );
            children.tagged_users.extend(
                unique_ids(student.tag_ids.iter().map(String::as_str))
                    .into_iter()
                    .map(|tag_id| TaggedUser::new(id.clone(), tag_id)),
            );
        }

        Ok(children)
    }
}

/// Persists whole students: the student aggregate, then its addresses, phone numbers,
/// enrollment history and tags. Addresses, phone numbers and tags are replaced as sets.
#[derive(Clone)]
pub struct StudentAggregateService {
    pub students: StudentRepo,
    pub addresses: Arc<dyn OwnedRowRepository<UserAddress>>,
    pub phone_numbers: Arc<dyn OwnedRowRepository<UserPhoneNumber>>,
    pub enrollment_status_histories: Arc<dyn EnrollmentStatusHistoryRepository>,
    pub tagged_users: Arc<dyn OwnedRowRepository<TaggedUser>>,
}

impl Default for StudentAggregateService {
    fn default() -> Self {
        Self {
            students: StudentRepo::default(),
            addresses: Arc::new(UserAddressRepo::default()),
            phone_numbers: Arc::new(UserPhoneNumberRepo::default()),
            enrollment_status_histories: Arc::new(EnrollmentStatusHistoryRepo),
            tagged_users: Arc::new(TaggedUserRepo::default()),
        }
    }
}

impl StudentAggregateService {
    pub async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        students: &[DomainStudent],
    ) -> Result<(), InternalError> {
        let result = async {
            let children = StudentChildren::collect(students)?;
            let owners = &children.student_ids;

            self.students.upsert_multiple(ctx, db, options, students).await?;
            self.addresses.replace_for_owners(ctx, db, options, owners, &children.addresses).await?;
            self.phone_numbers
                .replace_for_owners(ctx, db, options, owners, &children.phone_numbers)
                .await?;

            let histories = &children.enrollment_status_histories;
            if options.bulk_insert_enrollment_status_histories {
                self.enrollment_status_histories.bulk_insert(ctx, db, histories).await?;
            } else {
                self.enrollment_status_histories.upsert_multiple(ctx, db, options, histories).await?;
            }

            self.tagged_users.replace_for_owners(ctx, db, options, owners, &children.tagged_users).await
        }
        .await
        .wrap_step("StudentAggregateService::upsert_multiple");

        match &result {
            Ok(()) => info!("Upserted {} students", students.len()),
            Err(e) => error!("{}", e),
        }
        result
    }
}

/// Persists whole parents: the parent aggregate, then its phone numbers and its links to
/// students, both replaced as sets.
#[derive(Clone)]
pub struct ParentAggregateService {
    pub parents: ParentRepo,
    pub phone_numbers: Arc<dyn OwnedRowRepository<UserPhoneNumber>>,
    pub student_parents: Arc<dyn OwnedRowRepository<StudentParent>>,
}

impl Default for ParentAggregateService {
    fn default() -> Self {
        Self {
            parents: ParentRepo::default(),
            phone_numbers: Arc::new(UserPhoneNumberRepo::default()),
            student_parents: Arc::new(StudentParentRepo::default()),
        }
    }
}

impl ParentAggregateService {
    pub async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        parents: &[DomainParent],
    ) -> Result<(), InternalError> {
        let result = async {
            let parent_ids = ParentRepo::ids(parents)?;
            let mut phone_numbers = Vec::new();
            let mut links = Vec::new();
            for (parent, id) in parents.iter().zip(&parent_ids) {
                phone_numbers.extend(phone_rows(id, &parent.phone_numbers));
                links.extend(
                    parent
                        .children
                        .iter()
                        .map(|link| StudentParent { parent_id: id.clone(), ..link.clone() }),
                );
            }

            self.parents.upsert_multiple(ctx, db, options, parents).await?;
            self.phone_numbers.replace_for_owners(ctx, db, options, &parent_ids, &phone_numbers).await?;
            self.student_parents.replace_for_owners(ctx, db, options, &parent_ids, &links).await
        }
        .await
        .wrap_step("ParentAggregateService::upsert_multiple");

        match &result {
            Ok(()) => info!("Upserted {} parents", parents.len()),
            Err(e) => error!("{}", e),
        }
        result
    }
}
