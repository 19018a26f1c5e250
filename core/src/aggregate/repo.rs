use std::marker::PhantomData;

use tracing::{debug, error};

use crate::{
    aggregate::{
        domain::{
            aggregate_ids, DomainParent, DomainSchoolAdmin, DomainStudent, DomainTeacher,
            UserAggregate,
        },
        user_layer::{UserLayer, UserLayerRepos},
    },
    database::{
        send_and_consume, Batch, InternalError, OperationContext, QueryExecer, SuccessContract,
        WrapStep,
    },
    entity::{
        LEGACY_USER_GROUP_SCHEMA, USER_ACCESS_PATH_SCHEMA, USER_GROUP_MEMBER_SCHEMA, USER_SCHEMA,
    },
    options::UpsertOptions,
    repository::common::{insert_rows, upsert_rows},
};

/// Writes aggregates rooted at a user account: the user layer first, then one batch holding a
/// statement per primary row.
pub struct AggregateRepo<A> {
    user_layer: UserLayerRepos,
    _aggregate: PhantomData<fn() -> A>,
}

pub type StudentRepo = AggregateRepo<DomainStudent>;
pub type ParentRepo = AggregateRepo<DomainParent>;
pub type SchoolAdminRepo = AggregateRepo<DomainSchoolAdmin>;
pub type TeacherRepo = AggregateRepo<DomainTeacher>;

impl<A> Default for AggregateRepo<A> {
    fn default() -> Self {
        Self::with_user_layer(UserLayerRepos::default())
    }
}

impl<A> Clone for AggregateRepo<A> {
    fn clone(&self) -> Self {
        Self::with_user_layer(self.user_layer.clone())
    }
}

fn log_failure<T>(result: Result<T, InternalError>) -> Result<T, InternalError> {
    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

impl<A> AggregateRepo<A> {
    pub fn with_user_layer(user_layer: UserLayerRepos) -> Self {
        Self { user_layer, _aggregate: PhantomData }
    }
}

impl<A: UserAggregate> AggregateRepo<A> {
    fn step(operation: &str) -> String {
        format!("{}::{}", A::KIND.repo_name(), operation)
    }

    fn primary_rows(aggregates: &[A]) -> Vec<A::Primary> {
        aggregates.iter().map(A::primary_row).collect()
    }

    /// Upserts the user layer, then every primary row under the exactly-one-row contract.
    /// Stops at the first failing step.
    pub async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        aggregates: &[A],
    ) -> Result<(), InternalError> {
        let result = async {
            let layer = UserLayer::collect(aggregates)?;
            self.user_layer.upsert(ctx, db, options, &layer).await?;

            let rows = Self::primary_rows(aggregates);
            upsert_rows(ctx, db, options, &rows)
                .await
                .wrap_step(format!("upsert {}", A::primary_schema().table))
        }
        .await;

        log_failure(result.wrap_step(Self::step("upsert_multiple")))
    }

    /// Like [`AggregateRepo::upsert_multiple`] but with plain inserts, so an identity that
    /// already exists fails the call.
    pub async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        aggregates: &[A],
    ) -> Result<(), InternalError> {
        let result = async {
            let layer = UserLayer::collect(aggregates)?;
            self.user_layer.create(ctx, db, options, &layer).await?;

            let rows = Self::primary_rows(aggregates);
            insert_rows(ctx, db, &rows)
                .await
                .wrap_step(format!("insert {}", A::primary_schema().table))
        }
        .await;

        log_failure(result.wrap_step(Self::step("create_multiple")))
    }

    /// Soft-deletes the primary rows and the user layer of `ids` in one batch. Ids that match
    /// nothing are not an error.
    pub async fn soft_delete_by_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        ids: &[String],
    ) -> Result<(), InternalError> {
        let result = async {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(InternalError::Validation("cannot soft delete an empty id".to_string()));
            }

            let keys = vec![ids.to_vec()];
            let mut batch = Batch::new();
            if !ids.is_empty() {
                batch.queue_compiled(
                    A::primary_schema().compile_soft_delete(ctx, &[A::primary_key()], keys.clone())?,
                );
                for schema in [
                    &USER_ACCESS_PATH_SCHEMA,
                    &USER_GROUP_MEMBER_SCHEMA,
                    &LEGACY_USER_GROUP_SCHEMA,
                ] {
                    batch.queue_compiled(schema.compile_soft_delete(ctx, &["user_id"], keys.clone())?);
                }
                batch.queue_compiled(USER_SCHEMA.compile_soft_delete(ctx, &["user_id"], keys)?);
            }

            debug!("Soft deleting {} {} aggregates", ids.len(), A::primary_schema().table);
            send_and_consume(ctx, db, batch, SuccessContract::NoContract).await
        }
        .await;

        log_failure(result.wrap_step(Self::step("soft_delete_by_ids")))
    }

    /// Ids of `aggregates`, rejecting any aggregate without one.
    pub fn ids(aggregates: &[A]) -> Result<Vec<String>, InternalError> {
        aggregate_ids(aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::domain::DomainUser,
        database::{
            scripted::{ScriptedDb, ScriptedOutcome},
            DatabaseError, SqlValue,
        },
        entity::{Parent, SchoolAdmin, Student, Teacher, User, USER_GROUP_STUDENT},
    };

    fn student(id: &str, enrollment_status: &str) -> DomainStudent {
        DomainStudent {
            profile: DomainUser::new(User {
                name: Some(format!("student {}", id)),
                ..User::new(id, USER_GROUP_STUDENT)
            }),
            student: Student {
                current_grade: Some(5),
                enrollment_status: Some(enrollment_status.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_multiple_queues_one_statement_per_primary_row() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");
        let students = vec![
            student("s1", "STUDENT_ENROLLMENT_STATUS_ENROLLED"),
            student("s2", "STUDENT_ENROLLMENT_STATUS_ENROLLED"),
            student("s3", "STUDENT_ENROLLMENT_STATUS_ENROLLED"),
        ];

        StudentRepo::default()
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &students)
            .await
            .unwrap();

        let batches = db.batches();
        let primary = batches.last().unwrap();
        assert_eq!(primary.len(), 3);
        assert!(primary.iter().all(|s| s.sql.starts_with("INSERT INTO students ")));
        assert_eq!(primary[2].params[0], SqlValue::text("s3"));
        // users, legacy groups and students; no access paths or group members
        assert_eq!(batches.len(), 3);
        assert_eq!(db.reads(), 9);
        assert_eq!(db.closes(), 3);
    }

    #[tokio::test]
    async fn test_empty_enrollment_status_is_omitted() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        StudentRepo::default()
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[student("s1", "")])
            .await
            .unwrap();

        let batches = db.batches();
        let statement = &batches.last().unwrap()[0];
        assert!(!statement.sql.contains("enrollment_status"));
        assert_eq!(statement.params.len(), 11);
        assert!(statement.sql.contains("$11)"));
        assert!(!statement.sql.contains("$12"));
    }

    #[tokio::test]
    async fn test_closed_pool_on_first_exec() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Fail(DatabaseError::ClosedPool));
        let ctx = OperationContext::new("org-1");

        let err = StudentRepo::default()
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[student("s1", "")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("batchResults.Exec"));
        assert!(matches!(err.database_error(), Some(DatabaseError::ClosedPool)));
        assert_eq!(
            err.to_string(),
            "StudentRepo::upsert_multiple: UserRepo::upsert_multiple: batchResults.Exec: closed pool"
        );
        // nothing after the failing step was dispatched
        assert_eq!(db.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_primary_row_not_upserted() {
        let db = ScriptedDb::new();
        // users and legacy group succeed, the student row touches nothing
        db.push_outcome(ScriptedOutcome::Affected(1))
            .push_outcome(ScriptedOutcome::Affected(1))
            .push_outcome(ScriptedOutcome::Affected(0));
        let ctx = OperationContext::new("org-1");

        let err = StudentRepo::default()
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[student("s1", "")])
            .await
            .unwrap_err();

        assert_eq!(err.steps(), vec!["StudentRepo::upsert_multiple", "upsert students", "batchResults.Exec"]);
        assert!(matches!(err.root(), InternalError::RowCountMismatch { actual: 0, .. }));
    }

    #[tokio::test]
    async fn test_upsert_twice_revives_soft_deleted_rows() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");
        let repo = TeacherRepo::default();
        let teachers = vec![DomainTeacher {
            profile: DomainUser::new(User { user_id: "t1".to_string(), ..Default::default() }),
            teacher: Teacher { school_ids: vec!["1".to_string()], ..Default::default() },
        }];

        repo.upsert_multiple(&ctx, &db, &UpsertOptions::default(), &teachers).await.unwrap();
        repo.upsert_multiple(&ctx, &db, &UpsertOptions::default(), &teachers).await.unwrap();

        let sql = db.batched_sql();
        let (first, second) = sql.split_at(sql.len() / 2);
        assert_eq!(first, second);

        let batches = db.batches();
        let teacher_row = &batches.last().unwrap()[0];
        assert!(teacher_row.sql.contains("deleted_at = EXCLUDED.deleted_at"));
        assert!(!teacher_row.sql.contains("teacher_id = EXCLUDED"));
        let deleted_at = teacher_row.params.len() - 2;
        assert_eq!(teacher_row.params[deleted_at], SqlValue::Timestamptz(None));
    }

    #[tokio::test]
    async fn test_upsert_is_scoped_to_the_callers_tenant() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-B");
        let teachers = vec![DomainTeacher {
            profile: DomainUser::new(User { user_id: "t1".to_string(), ..Default::default() }),
            ..Default::default()
        }];

        TeacherRepo::default()
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &teachers)
            .await
            .unwrap();

        let sql = db.batched_sql();
        assert_eq!(sql.len(), 3);
        for statement in &sql {
            let action = statement.split_once("DO UPDATE SET ").unwrap().1;
            let (set_clause, guard) = action.split_once(" WHERE ").unwrap();
            assert!(!set_clause.contains("resource_path"));
            assert!(guard.ends_with(".resource_path = EXCLUDED.resource_path"));
        }
        let batches = db.batches();
        let teacher_row = &batches.last().unwrap()[0];
        assert_eq!(teacher_row.params.last(), Some(&SqlValue::text("org-B")));

        // a row owned by another tenant is left alone, so the upsert reports no rows
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Affected(0));
        let err = TeacherRepo::default()
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &teachers)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), InternalError::RowCountMismatch { actual: 0, .. }));
        assert_eq!(db.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_create_multiple_uses_plain_inserts() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");
        let admins = vec![DomainSchoolAdmin {
            profile: DomainUser::new(User { user_id: "a1".to_string(), ..Default::default() })
                .with_location("loc-1"),
            school_admin: SchoolAdmin { school_id: Some(3), ..Default::default() },
        }];

        SchoolAdminRepo::default()
            .create_multiple(&ctx, &db, &UpsertOptions::default(), &admins)
            .await
            .unwrap();

        let sql = db.batched_sql();
        assert!(sql[0].starts_with("INSERT INTO users "));
        assert!(!sql[0].contains("ON CONFLICT"));
        assert!(sql.last().unwrap().starts_with("INSERT INTO school_admins "));
        assert!(!sql.last().unwrap().contains("ON CONFLICT"));
    }

    #[tokio::test]
    async fn test_soft_delete_by_ids_is_one_batch() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Affected(0));
        let ctx = OperationContext::new("org-1");

        ParentRepo::default()
            .soft_delete_by_ids(&ctx, &db, &["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();

        let batches = db.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
        assert!(batches[0][0].sql.starts_with("UPDATE parents SET deleted_at"));
        assert!(batches[0][0].sql.contains("parent_id = ANY($1)"));
        assert!(batches[0][4].sql.starts_with("UPDATE users SET deleted_at"));
        assert_eq!(batches[0][4].params[1], SqlValue::text("org-1"));
    }

    #[tokio::test]
    async fn test_soft_delete_rejects_empty_id() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        let err = ParentRepo::default().soft_delete_by_ids(&ctx, &db, &[String::new()]).await.unwrap_err();

        assert!(matches!(err.root(), InternalError::Validation(_)));
        assert!(db.batches().is_empty());
        assert!(ParentRepo::ids(&[DomainParent {
            parent: Parent::default(),
            ..Default::default()
        }])
        .is_err());
    }
}
