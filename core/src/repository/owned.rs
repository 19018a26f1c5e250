use std::marker::PhantomData;

use async_trait::async_trait;

use crate::{
    database::{FieldMap, InternalError, OperationContext, QueryExecer, TableSchema, WrapStep},
    entity::{
        StudentParent, TaggedUser, UserAddress, UserPhoneNumber, STUDENT_PARENT_SCHEMA,
        TAGGED_USER_SCHEMA, USER_ADDRESS_SCHEMA, USER_PHONE_NUMBER_SCHEMA,
    },
    options::UpsertOptions,
    repository::common::{replace_rows, soft_delete_rows, upsert_rows},
};

/// Repository of rows that belong to an owner (a user or a parent) and are replaced as a set
/// whenever the owner is written.
#[async_trait]
pub trait OwnedRowRepository<E>: Send + Sync
where
    E: FieldMap + 'static,
{
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        rows: &[E],
    ) -> Result<(), InternalError>;

    async fn soft_delete_by_owner_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        owner_ids: &[String],
    ) -> Result<u64, InternalError>;

    /// Soft-deletes the live rows of `owner_ids` and upserts `rows`, in that order, in one
    /// batch.
    async fn replace_for_owners(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        owner_ids: &[String],
        rows: &[E],
    ) -> Result<(), InternalError>;
}

pub struct OwnedRowRepo<E> {
    name: &'static str,
    schema: &'static TableSchema,
    owner_column: &'static str,
    _entity: PhantomData<fn() -> E>,
}

impl<E> OwnedRowRepo<E> {
    const fn new(
        name: &'static str,
        schema: &'static TableSchema,
        owner_column: &'static str,
    ) -> Self {
        Self { name, schema, owner_column, _entity: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn owner_column(&self) -> &'static str {
        self.owner_column
    }

    fn step(&self, operation: &str) -> String {
        format!("{}::{}", self.name, operation)
    }
}

impl<E> std::fmt::Debug for OwnedRowRepo<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedRowRepo")
            .field("name", &self.name)
            .field("table", &self.schema.table)
            .field("owner_column", &self.owner_column)
            .finish()
    }
}

pub type UserPhoneNumberRepo = OwnedRowRepo<UserPhoneNumber>;
pub type UserAddressRepo = OwnedRowRepo<UserAddress>;
pub type TaggedUserRepo = OwnedRowRepo<TaggedUser>;
pub type StudentParentRepo = OwnedRowRepo<StudentParent>;

impl Default for UserPhoneNumberRepo {
    fn default() -> Self {
        Self::new("UserPhoneNumberRepo", &USER_PHONE_NUMBER_SCHEMA, "user_id")
    }
}

impl Default for UserAddressRepo {
    fn default() -> Self {
        Self::new("UserAddressRepo", &USER_ADDRESS_SCHEMA, "user_id")
    }
}

impl Default for TaggedUserRepo {
    fn default() -> Self {
        Self::new("TaggedUserRepo", &TAGGED_USER_SCHEMA, "user_id")
    }
}

impl Default for StudentParentRepo {
    fn default() -> Self {
        Self::new("StudentParentRepo", &STUDENT_PARENT_SCHEMA, "parent_id")
    }
}

#[async_trait]
impl<E> OwnedRowRepository<E> for OwnedRowRepo<E>
where
    E: FieldMap + 'static,
{
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        rows: &[E],
    ) -> Result<(), InternalError> {
        upsert_rows(ctx, db, options, rows).await.wrap_step(self.step("upsert_multiple"))
    }

    async fn soft_delete_by_owner_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        owner_ids: &[String],
    ) -> Result<u64, InternalError> {
        soft_delete_rows(ctx, db, self.schema, self.owner_column, owner_ids)
            .await
            .wrap_step(self.step("soft_delete_by_owner_ids"))
    }

    async fn replace_for_owners(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        owner_ids: &[String],
        rows: &[E],
    ) -> Result<(), InternalError> {
        replace_rows(ctx, db, options, self.schema, self.owner_column, owner_ids, rows)
            .await
            .wrap_step(self.step("replace_for_owners"))
    }
}
