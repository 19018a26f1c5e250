use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::{
    database::{
        scan_into, FieldMap, InternalError, OperationContext, QueryExecer, SqlValue,
        SuccessContract, WrapStep,
    },
    entity::{EnrollmentStatusHistory, ENROLLMENT_STATUS_HISTORY_SCHEMA},
    options::UpsertOptions,
    repository::common::{soft_delete_rows, upsert_rows},
};

#[async_trait]
pub trait EnrollmentStatusHistoryRepository: Send + Sync {
    /// One upsert per history in a single batch.
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        histories: &[EnrollmentStatusHistory],
    ) -> Result<(), InternalError>;

    /// Every history in one multi-row insert.
    async fn bulk_insert(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        histories: &[EnrollmentStatusHistory],
    ) -> Result<(), InternalError>;

    async fn soft_delete_by_student_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        student_ids: &[String],
    ) -> Result<u64, InternalError>;

    async fn get_by_student_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        student_ids: &[String],
    ) -> Result<Vec<EnrollmentStatusHistory>, InternalError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnrollmentStatusHistoryRepo;

#[async_trait]
impl EnrollmentStatusHistoryRepository for EnrollmentStatusHistoryRepo {
    async fn upsert_multiple(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        options: &UpsertOptions,
        histories: &[EnrollmentStatusHistory],
    ) -> Result<(), InternalError> {
        upsert_rows(ctx, db, options, histories)
            .await
            .wrap_step("EnrollmentStatusHistoryRepo::upsert_multiple")
    }

    async fn bulk_insert(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        histories: &[EnrollmentStatusHistory],
    ) -> Result<(), InternalError> {
        if histories.is_empty() {
            return Ok(());
        }

        let rows = histories.iter().map(|h| h.field_values()).collect();
        let statements = ENROLLMENT_STATUS_HISTORY_SCHEMA
            .compile_bulk_inserts(ctx, Utc::now(), rows)
            .wrap_step("EnrollmentStatusHistoryRepo::bulk_insert")?;

        debug!(
            "Bulk inserting {} enrollment status histories in {} statements",
            histories.len(),
            statements.len()
        );

        for statement in statements {
            let affected = db
                .exec(ctx, &statement.sql, &statement.params)
                .await
                .wrap_step("EnrollmentStatusHistoryRepo::bulk_insert")?;
            SuccessContract::AtLeastOneRow
                .check(affected)
                .wrap_step("EnrollmentStatusHistoryRepo::bulk_insert")?;
        }
        Ok(())
    }

    async fn soft_delete_by_student_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        student_ids: &[String],
    ) -> Result<u64, InternalError> {
        soft_delete_rows(ctx, db, &ENROLLMENT_STATUS_HISTORY_SCHEMA, "student_id", student_ids)
            .await
            .wrap_step("EnrollmentStatusHistoryRepo::soft_delete_by_student_ids")
    }

    async fn get_by_student_ids(
        &self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
        student_ids: &[String],
    ) -> Result<Vec<EnrollmentStatusHistory>, InternalError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE student_id = ANY($1) AND resource_path = $2 \
             AND deleted_at IS NULL ORDER BY start_date",
            ENROLLMENT_STATUS_HISTORY_SCHEMA.column_names().join(", "),
            ENROLLMENT_STATUS_HISTORY_SCHEMA.table
        );
        let params = [
            SqlValue::TextArray(Some(student_ids.to_vec())),
            SqlValue::text(ctx.organization_id()),
        ];

        let rows = db
            .query(ctx, &sql, &params)
            .await
            .wrap_step("EnrollmentStatusHistoryRepo::get_by_student_ids")?;
        rows.into_iter()
            .map(scan_into::<EnrollmentStatusHistory>)
            .collect::<Result<Vec<_>, _>>()
            .wrap_step("EnrollmentStatusHistoryRepo::get_by_student_ids")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        database::scripted::{ScriptedDb, ScriptedOutcome},
        entity::STUDENT_ENROLLMENT_STATUS_ENROLLED,
    };

    fn history(student_id: &str, location_id: &str) -> EnrollmentStatusHistory {
        EnrollmentStatusHistory {
            student_id: student_id.to_string(),
            ..EnrollmentStatusHistory::new(
                location_id,
                STUDENT_ENROLLMENT_STATUS_ENROLLED,
                Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            )
        }
    }

    #[tokio::test]
    async fn test_bulk_insert_is_one_statement() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Affected(2));
        let ctx = OperationContext::new("org-1");

        EnrollmentStatusHistoryRepo
            .bulk_insert(&ctx, &db, &[history("s1", "loc-1"), history("s2", "loc-1")])
            .await
            .unwrap();

        let execs = db.execs();
        assert_eq!(execs.len(), 1);
        assert!(execs[0].sql.starts_with("INSERT INTO student_enrollment_status_history ("));
        assert!(execs[0].sql.ends_with("($12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)"));
        assert_eq!(execs[0].params.len(), 22);
        assert!(db.batches().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_insert_splits_past_the_bind_parameter_limit() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");
        let max_rows = ENROLLMENT_STATUS_HISTORY_SCHEMA.max_bulk_rows();
        let histories: Vec<_> = (0..max_rows + 1).map(|_| history("s1", "loc-1")).collect();

        EnrollmentStatusHistoryRepo.bulk_insert(&ctx, &db, &histories).await.unwrap();

        let execs = db.execs();
        assert_eq!(execs.len(), 2);
        assert!(execs.iter().all(|e| e.params.len() <= u16::MAX as usize));
        assert_eq!(execs[1].params.len(), ENROLLMENT_STATUS_HISTORY_SCHEMA.columns.len());
    }

    #[tokio::test]
    async fn test_bulk_insert_rejects_zero_rows_affected() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Affected(0));
        let ctx = OperationContext::new("org-1");

        let err = EnrollmentStatusHistoryRepo
            .bulk_insert(&ctx, &db, &[history("s1", "loc-1")])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "EnrollmentStatusHistoryRepo::bulk_insert: rows affected: expected at least 1, got 0"
        );
    }

    #[tokio::test]
    async fn test_bulk_insert_of_nothing_is_a_no_op() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        EnrollmentStatusHistoryRepo.bulk_insert(&ctx, &db, &[]).await.unwrap();
        assert!(db.execs().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_multiple_batches_each_history() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        EnrollmentStatusHistoryRepo
            .upsert_multiple(&ctx, &db, &UpsertOptions::default(), &[history("s1", "loc-1"), history("s1", "loc-2")])
            .await
            .unwrap();

        assert_eq!(db.batches()[0].len(), 2);
        assert!(db.batched_sql()[0]
            .contains("ON CONFLICT ON CONSTRAINT pk__student_enrollment_status_history DO UPDATE SET end_date = EXCLUDED.end_date"));
    }
}
