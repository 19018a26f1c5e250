use std::sync::Arc;

use tracing::debug;

use crate::{
    aggregate::domain::{aggregate_ids, UserAggregate},
    database::{InternalError, OperationContext, QueryExecer},
    entity::{LegacyUserGroup, User, UserAccessPath, UserGroupMember},
    options::UpsertOptions,
    repository::{
        common::unique_ids, LegacyUserGroupRepo, LegacyUserGroupRepository, UserAccessPathRepo,
        UserAccessPathRepository, UserGroupMemberRepo, UserGroupMemberRepository, UserRepo,
        UserRepository,
    },
};

/// The user-side rows of a set of aggregates, flattened per table in aggregate order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLayer {
    pub users: Vec<User>,
    pub legacy_user_groups: Vec<LegacyUserGroup>,
    pub user_group_members: Vec<UserGroupMember>,
    pub access_paths: Vec<UserAccessPath>,
    /// Users whose live access paths are superseded by `access_paths`.
    pub access_path_owners: Vec<String>,
}

impl UserLayer {
    pub fn collect<A: UserAggregate>(aggregates: &[A]) -> Result<Self, InternalError> {
        let ids = aggregate_ids(aggregates)?;
        let user_group = A::KIND.user_group();
        let mut layer = UserLayer::default();

        for (aggregate, id) in aggregates.iter().zip(ids) {
            let profile = aggregate.profile();

            let mut user = profile.user.clone();
            user.user_group.get_or_insert_with(|| user_group.to_string());
            layer.users.push(user);

            layer.legacy_user_groups.push(LegacyUserGroup::origin(id.clone(), user_group));

            for group_id in unique_ids(profile.user_group_ids.iter().map(String::as_str)) {
                layer.user_group_members.push(UserGroupMember::new(id.clone(), group_id));
            }

            if !profile.access_paths.is_empty() {
                layer.access_path_owners.push(id.clone());
                layer.access_paths.extend(
                    profile
                        .access_paths
                        .iter()
                        .map(|path| UserAccessPath { user_id: id.clone(), ..path.clone() }),
                );
            }
        }

        Ok(layer)
    }
}

/// Repositories behind the user layer. Swappable so callers can route single tables elsewhere.
#[derive(Clone)]
pub struct UserLayerRepos {
    pub users: Arc<dyn UserRepository>,
    pub legacy_user_groups: Arc<dyn LegacyUserGroupRepository>,
    pub user_group_members: Arc<dyn UserGroupMemberRepository>,
    pub access_paths: Arc<dyn UserAccessPathRepository>,
}

impl Default for UserLayerRepos {
    fn default() -> Self {
        Self {
            users: Arc::new(UserRepo),
            legacy_user_groups: Arc::new(LegacyUserGroupRepo),
            user_group_members: Arc::new(UserGroupMemberRepo),
            access_paths: Arc::new(UserAccessPathRepo),
        }
    }
}

impl UserLayerRepos {
    /// Access paths, then users, then legacy groups, then group members. Each step is its own
    /// dispatch and starts only once the previous one succeeded.
    pub async fn upsert(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        layer: &UserLayer,
    ) -> Result<(), InternalError> {
        debug!(
            "Upserting user layer: {} users, {} access paths, {} group members",
            layer.users.len(),
            layer.access_paths.len(),
            layer.user_group_members.len()
        );

        self.access_paths
            .replace_for_users(ctx, db, options, &layer.access_path_owners, &layer.access_paths)
            .await?;
        self.users.upsert_multiple(ctx, db, options, &layer.users).await?;
        self.legacy_user_groups.upsert_multiple(ctx, db, options, &layer.legacy_user_groups).await?;
        self.user_group_members.upsert_multiple(ctx, db, options, &layer.user_group_members).await
    }

    /// Inserts brand new users. Fails on any identity that already exists.
    pub async fn create(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        layer: &UserLayer,
    ) -> Result<(), InternalError> {
        self.users.create_multiple(ctx, db, &layer.users).await?;
        self.legacy_user_groups.create_multiple(ctx, db, &layer.legacy_user_groups).await?;
        self.access_paths.upsert_multiple(ctx, db, options, &layer.access_paths).await?;
        self.user_group_members.upsert_multiple(ctx, db, options, &layer.user_group_members).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::domain::{DomainSchoolAdmin, DomainUser},
        database::{
            scripted::{ScriptedDb, ScriptedOutcome},
            DatabaseError,
        },
        entity::USER_GROUP_SCHOOL_ADMIN,
    };

    fn admin(id: &str) -> DomainSchoolAdmin {
        DomainSchoolAdmin {
            profile: DomainUser::new(User { user_id: id.to_string(), ..Default::default() }),
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_fills_user_keys() {
        let mut first = admin("a1");
        first.profile = first.profile.with_location("loc-1").with_user_group("g1").with_user_group("g1");
        first.profile.access_paths[0].user_id = "someone-else".to_string();

        let layer = UserLayer::collect(&[first, admin("a2")]).unwrap();

        assert_eq!(layer.users.len(), 2);
        assert_eq!(layer.users[1].user_group.as_deref(), Some(USER_GROUP_SCHOOL_ADMIN));
        assert_eq!(layer.legacy_user_groups[1], LegacyUserGroup::origin("a2", USER_GROUP_SCHOOL_ADMIN));
        assert_eq!(layer.user_group_members, vec![UserGroupMember::new("a1", "g1")]);
        assert_eq!(layer.access_paths[0].user_id, "a1");
        assert_eq!(layer.access_path_owners, vec!["a1"]);
    }

    #[tokio::test]
    async fn test_upsert_runs_steps_in_order() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");
        let mut aggregate = admin("a1");
        aggregate.profile = aggregate.profile.with_location("loc-1").with_user_group("g1");
        let layer = UserLayer::collect(&[aggregate]).unwrap();

        UserLayerRepos::default().upsert(&ctx, &db, &UpsertOptions::default(), &layer).await.unwrap();

        let sql = db.batched_sql();
        assert_eq!(sql.len(), 5);
        assert!(sql[0].starts_with("UPDATE user_access_paths SET deleted_at"));
        assert!(sql[1].starts_with("INSERT INTO user_access_paths "));
        assert!(sql[2].starts_with("INSERT INTO users "));
        assert!(sql[3].starts_with("INSERT INTO users_groups "));
        assert!(sql[4].starts_with("INSERT INTO user_group_member "));
        assert_eq!(db.batches().len(), 4);
    }

    #[tokio::test]
    async fn test_upsert_stops_at_failing_step() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Fail(DatabaseError::ClosedPool));
        let ctx = OperationContext::new("org-1");
        let layer = UserLayer::collect(&[admin("a1")]).unwrap();

        let err = UserLayerRepos::default()
            .upsert(&ctx, &db, &UpsertOptions::default(), &layer)
            .await
            .unwrap_err();

        assert_eq!(err.steps(), vec!["UserRepo::upsert_multiple", "batchResults.Exec"]);
        assert_eq!(db.batches().len(), 1);
    }
}
