use async_trait::async_trait;

use crate::{
    database::{
        scan_into, InternalError, OperationContext, QueryExecer, SqlValue, WrapStep,
    },
    entity::{
        LegacyUserGroup, User, UserAccessPath, UserGroupMember, LEGACY_USER_GROUP_SCHEMA,
        USER_ACCESS_PATH_SCHEMA, USER_GROUP_MEMBER_SCHEMA, USER_SCHEMA,
    },
    options::UpsertOptions,
    repository::common::{insert_rows, replace_rows, soft_delete_rows, upsert_rows},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        users: &[User],
    ) -> Result<(), InternalError>;

    async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        users: &[User],
    ) -> Result<(), InternalError>;

    async fn soft_delete_by_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError>;

    async fn get_by_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<Vec<User>, InternalError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserRepo;

#[async_trait]
impl UserRepository for UserRepo {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        users: &[User],
    ) -> Result<(), InternalError> {
        let users: Vec<User> = users
            .iter()
            .map(|user| User { login_email: user.effective_login_email(options), ..user.clone() })
            .collect();
        upsert_rows(ctx, db, options, &users).await.wrap_step("UserRepo::upsert_multiple")
    }

    async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        users: &[User],
    ) -> Result<(), InternalError> {
        insert_rows(ctx, db, users).await.wrap_step("UserRepo::create_multiple")
    }

    async fn soft_delete_by_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError> {
        soft_delete_rows(ctx, db, &USER_SCHEMA, "user_id", user_ids)
            .await
            .wrap_step("UserRepo::soft_delete_by_ids")
    }

    async fn get_by_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<Vec<User>, InternalError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = ANY($1) AND resource_path = $2 AND deleted_at IS NULL",
            USER_SCHEMA.column_names().join(", "),
            USER_SCHEMA.table
        );
        let params = [
            SqlValue::TextArray(Some(user_ids.to_vec())),
            SqlValue::text(ctx.organization_id()),
        ];

        let rows = db.query(ctx, &sql, &params).await.wrap_step("UserRepo::get_by_ids")?;
        rows.into_iter()
            .map(scan_into::<User>)
            .collect::<Result<Vec<_>, _>>()
            .wrap_step("UserRepo::get_by_ids")
    }
}

#[async_trait]
pub trait LegacyUserGroupRepository: Send + Sync {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        groups: &[LegacyUserGroup],
    ) -> Result<(), InternalError>;

    async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        groups: &[LegacyUserGroup],
    ) -> Result<(), InternalError>;

    async fn soft_delete_by_user_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyUserGroupRepo;

#[async_trait]
impl LegacyUserGroupRepository for LegacyUserGroupRepo {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        groups: &[LegacyUserGroup],
    ) -> Result<(), InternalError> {
        upsert_rows(ctx, db, options, groups).await.wrap_step("LegacyUserGroupRepo::upsert_multiple")
    }

    async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        groups: &[LegacyUserGroup],
    ) -> Result<(), InternalError> {
        insert_rows(ctx, db, groups).await.wrap_step("LegacyUserGroupRepo::create_multiple")
    }

    async fn soft_delete_by_user_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError> {
        soft_delete_rows(ctx, db, &LEGACY_USER_GROUP_SCHEMA, "user_id", user_ids)
            .await
            .wrap_step("LegacyUserGroupRepo::soft_delete_by_user_ids")
    }
}

#[async_trait]
pub trait UserGroupMemberRepository: Send + Sync {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        members: &[UserGroupMember],
    ) -> Result<(), InternalError>;

    async fn soft_delete_by_user_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserGroupMemberRepo;

#[async_trait]
impl UserGroupMemberRepository for UserGroupMemberRepo {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        members: &[UserGroupMember],
    ) -> Result<(), InternalError> {
        upsert_rows(ctx, db, options, members).await.wrap_step("UserGroupMemberRepo::upsert_multiple")
    }

    async fn soft_delete_by_user_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError> {
        soft_delete_rows(ctx, db, &USER_GROUP_MEMBER_SCHEMA, "user_id", user_ids)
            .await
            .wrap_step("UserGroupMemberRepo::soft_delete_by_user_ids")
    }
}

#[async_trait]
pub trait UserAccessPathRepository: Send + Sync {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        paths: &[UserAccessPath],
    ) -> Result<(), InternalError>;

    async fn soft_delete_by_user_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError>;

    /// Soft-deletes the live paths of `user_ids` and upserts `paths`, in that order, in one
    /// batch.
    async fn replace_for_users(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        user_ids: &[String],
        paths: &[UserAccessPath],
    ) -> Result<(), InternalError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserAccessPathRepo;

#[async_trait]
impl UserAccessPathRepository for UserAccessPathRepo {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        paths: &[UserAccessPath],
    ) -> Result<(), InternalError> {
        upsert_rows(ctx, db, options, paths).await.wrap_step("UserAccessPathRepo::upsert_multiple")
    }

    async fn soft_delete_by_user_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        user_ids: &[String],
    ) -> Result<u64, InternalError> {
        soft_delete_rows(ctx, db, &USER_ACCESS_PATH_SCHEMA, "user_id", user_ids)
            .await
            .wrap_step("UserAccessPathRepo::soft_delete_by_user_ids")
    }

    async fn replace_for_users(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        user_ids: &[String],
        paths: &[UserAccessPath],
    ) -> Result<(), InternalError> {
        replace_rows(ctx, db, options, &USER_ACCESS_PATH_SCHEMA, "user_id", user_ids, paths)
            .await
            .wrap_step("UserAccessPathRepo::replace_for_users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::{
            scripted::{ScriptedDb, ScriptedOutcome},
            DatabaseError, FieldMap,
        },
        entity::USER_GROUP_STUDENT,
    };

    fn user(id: &str) -> User {
        User {
            name: Some(format!("name {}", id)),
            email: Some(format!("{}@example.com", id)),
            ..User::new(id, USER_GROUP_STUDENT)
        }
    }

    #[tokio::test]
    async fn test_upsert_multiple_queues_one_statement_per_user() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        UserRepo
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[user("u1"), user("u2")])
            .await
            .unwrap();

        let batches = db.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0][0].sql.contains("ON CONFLICT ON CONSTRAINT users_pk DO UPDATE SET"));
        assert!(!batches[0][0].sql.contains("username = EXCLUDED.username"));
        assert_eq!(batches[0][1].params[0], SqlValue::text("u2"));
    }

    #[tokio::test]
    async fn test_upsert_multiple_fills_login_email_without_username_login() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        UserRepo
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[user("u1")])
            .await
            .unwrap();

        let login_email_idx =
            USER_SCHEMA.column_names().iter().position(|c| *c == "login_email").unwrap();
        assert_eq!(db.batches()[0][0].params[login_email_idx], SqlValue::text("u1@example.com"));
    }

    #[tokio::test]
    async fn test_upsert_multiple_reports_user_not_upserted() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Affected(0));
        let ctx = OperationContext::new("org-1");

        let err = UserRepo
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[user("u1")])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "UserRepo::upsert_multiple: batchResults.Exec: rows affected: expected exactly 1, got 0"
        );
    }

    #[tokio::test]
    async fn test_create_multiple_closed_pool() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Fail(DatabaseError::ClosedPool));
        let ctx = OperationContext::new("org-1");

        let err = UserRepo.create_multiple(&ctx, &db, &[user("u1")]).await.unwrap_err();

        assert_eq!(err.to_string(), "UserRepo::create_multiple: batchResults.Exec: closed pool");
        assert!(!db.batches()[0][0].sql.contains("ON CONFLICT"));
    }

    #[tokio::test]
    async fn test_get_by_ids_scans_rows() {
        let db = ScriptedDb::new();
        let stored = User { resource_path: Some("org-1".to_string()), ..user("u1") };
        db.push_query_result(vec![stored.field_values()]);
        let ctx = OperationContext::new("org-1");

        let users = UserRepo.get_by_ids(&ctx, &db, &["u1".to_string()]).await.unwrap();

        assert_eq!(users, vec![stored]);
        let execs = db.execs();
        assert!(execs[0].sql.starts_with("SELECT user_id, name, first_name"));
        assert_eq!(execs[0].params[1], SqlValue::text("org-1"));
    }

    #[tokio::test]
    async fn test_replace_access_paths_in_one_batch() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        UserAccessPathRepo
            .replace_for_users(
                &ctx,
                &db,
                &UpsertOptions::default(),
                &["u1".to_string()],
                &[UserAccessPath::new("u1", "loc-1")],
            )
            .await
            .unwrap();

        let sql = db.batched_sql();
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("UPDATE user_access_paths SET deleted_at = now()"));
        assert!(sql[1].starts_with("INSERT INTO user_access_paths"));
    }
}
