use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::{
    database::{
        consume_returning, Batch, FieldMap, InternalError, OperationContext, QueryExecer, WrapStep,
    },
    entity::UsrEmail,
};

#[async_trait]
pub trait UsrEmailRepository: Send + Sync {
    /// Inserts every email and hands back the stored rows, including the `usr_id` the database
    /// generated for rows that came without one.
    async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        emails: &[UsrEmail],
    ) -> Result<Vec<UsrEmail>, InternalError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UsrEmailRepo;

#[async_trait]
impl UsrEmailRepository for UsrEmailRepo {
    async fn create_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        emails: &[UsrEmail],
    ) -> Result<Vec<UsrEmail>, InternalError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut batch = Batch::new();
        for email in emails {
            let statement = email
                .schema()
                .compile_insert_returning(ctx, now, email.field_values())
                .wrap_step("UsrEmailRepo::create_multiple")?;
            batch.queue_compiled_returning(statement);
        }
        debug!("Creating {} usr_email rows", emails.len());

        let results = batch.dispatch(ctx, db).await;
        consume_returning::<UsrEmail>(results, emails.len())
            .await
            .wrap_step("UsrEmailRepo::create_multiple")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::database::{
        scripted::{ScriptedDb, ScriptedOutcome},
        SqlValue,
    };

    #[tokio::test]
    async fn test_create_multiple_returns_generated_ids() {
        let db = ScriptedDb::new();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        db.push_outcome(ScriptedOutcome::Row(vec![
            SqlValue::text("generated-1"),
            SqlValue::text("a@example.com"),
            SqlValue::Timestamptz(Some(created)),
            SqlValue::Timestamptz(Some(created)),
            SqlValue::Timestamptz(None),
            SqlValue::text("org-1"),
        ]));
        let ctx = OperationContext::new("org-1");

        let emails = UsrEmailRepo
            .create_multiple(
                &ctx,
                &db,
                &[UsrEmail { email: "a@example.com".to_string(), ..Default::default() }],
            )
            .await
            .unwrap();

        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].usr_id.as_deref(), Some("generated-1"));
        assert_eq!(emails[0].resource_path.as_deref(), Some("org-1"));

        let sql = &db.batched_sql()[0];
        assert!(sql.starts_with("INSERT INTO usr_email (email, created_at"));
        assert!(sql.ends_with("RETURNING usr_id, email, created_at, updated_at, deleted_at, resource_path"));
    }

    #[tokio::test]
    async fn test_create_multiple_no_rows_is_distinct() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        let err = UsrEmailRepo
            .create_multiple(
                &ctx,
                &db,
                &[UsrEmail { email: "a@example.com".to_string(), ..Default::default() }],
            )
            .await
            .unwrap_err();

        assert!(err.is_no_rows());
        assert_eq!(err.to_string(), "UsrEmailRepo::create_multiple: batchResults.QueryRow: no rows in result set");
    }
}
