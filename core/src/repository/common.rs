use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    database::{
        send_and_consume, Batch, BatchConsumer, FieldMap, InternalError, OperationContext,
        QueryExecer, SuccessContract, TableSchema,
    },
    options::UpsertOptions,
};

pub(crate) fn queue_upserts<E: FieldMap>(
    batch: &mut Batch,
    ctx: &OperationContext,
    now: DateTime<Utc>,
    options: &UpsertOptions,
    rows: &[E],
) -> Result<(), InternalError> {
    for row in rows {
        let statement = row.schema().compile_upsert(ctx, now, row.field_values(), options)?;
        batch.queue_compiled(statement);
    }
    Ok(())
}

/// One upsert per row in a single batch, each of which must touch exactly one row.
pub(crate) async fn upsert_rows<E: FieldMap>(
    ctx: &OperationContext,
    db: &dyn QueryExecer,
    options: &UpsertOptions,
    rows: &[E],
) -> Result<(), InternalError> {
    let mut batch = Batch::new();
    queue_upserts(&mut batch, ctx, Utc::now(), options, rows)?;
    if let Some(row) = rows.first() {
        debug!("Upserting {} rows into {}", rows.len(), row.table_name());
    }
    send_and_consume(ctx, db, batch, SuccessContract::ExactlyOneRow).await
}

/// One plain insert per row in a single batch, each of which must insert exactly one row.
pub(crate) async fn insert_rows<E: FieldMap>(
    ctx: &OperationContext,
    db: &dyn QueryExecer,
    rows: &[E],
) -> Result<(), InternalError> {
    let now = Utc::now();
    let mut batch = Batch::new();
    for row in rows {
        batch.queue_compiled(row.schema().compile_insert(ctx, now, row.field_values())?);
    }
    send_and_consume(ctx, db, batch, SuccessContract::ExactlyOneRow).await
}

/// Soft-deletes every live row of `schema` whose `key_column` is in `keys`.
pub(crate) async fn soft_delete_rows(
    ctx: &OperationContext,
    db: &dyn QueryExecer,
    schema: &TableSchema,
    key_column: &str,
    keys: &[String],
) -> Result<u64, InternalError> {
    if keys.is_empty() {
        return Ok(0);
    }

    let statement = schema.compile_soft_delete(ctx, &[key_column], vec![keys.to_vec()])?;
    let affected = db.exec(ctx, &statement.sql, &statement.params).await?;
    debug!("Soft deleted {} rows of {}", affected, schema.table);
    Ok(affected)
}

/// Supersedes the live rows owned by `owner_ids` with `rows`: one batch holding the soft
/// delete followed by an upsert per row. Upserting clears `deleted_at`, so rows present both
/// before and after come back to life.
pub(crate) async fn replace_rows<E: FieldMap>(
    ctx: &OperationContext,
    db: &dyn QueryExecer,
    options: &UpsertOptions,
    schema: &TableSchema,
    owner_column: &str,
    owner_ids: &[String],
    rows: &[E],
) -> Result<(), InternalError> {
    if owner_ids.is_empty() && rows.is_empty() {
        return Ok(());
    }

    let mut batch = Batch::new();
    let cleans = if owner_ids.is_empty() {
        0
    } else {
        let statement = schema.compile_soft_delete(ctx, &[owner_column], vec![owner_ids.to_vec()])?;
        batch.queue_compiled(statement);
        1
    };
    queue_upserts(&mut batch, ctx, Utc::now(), options, rows)?;

    debug!(
        "Replacing {} rows of {} for {} owners",
        rows.len(),
        schema.table,
        owner_ids.len()
    );

    let mut consumer = BatchConsumer::new(batch.dispatch(ctx, db).await);
    let outcome = async {
        consumer.expect(cleans, SuccessContract::NoContract).await?;
        consumer.expect(rows.len(), SuccessContract::ExactlyOneRow).await
    }
    .await;
    consumer.finish(outcome).await
}

/// Drops duplicates while keeping first-seen order.
pub(crate) fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).map(str::to_string).collect()
}
