use tracing::{info, warn};

use crate::{
    database::{
        postgres::client::{PostgresClient, PostgresConnectionError},
        InternalError, OperationContext, QueryExecer, SqlValue, WrapStep,
    },
    entity::ALL_SCHEMAS,
    manifest::core::Manifest,
};

#[derive(thiserror::Error, Debug)]
pub enum SetupPostgresError {
    #[error("{0}")]
    PostgresConnection(#[from] PostgresConnectionError),

    #[error("Could not inspect the database schema: {0}")]
    Inspect(#[from] InternalError),
}

const MISSING_TABLES_SQL: &str = "SELECT t.name FROM unnest($1::text[]) AS t(name) \
     WHERE NOT EXISTS (SELECT 1 FROM information_schema.tables i \
     WHERE i.table_name = t.name AND i.table_schema = current_schema()) \
     ORDER BY t.name";

/// Tables the engine writes to that do not exist in the connected schema.
pub async fn missing_tables(
    ctx: &OperationContext,
    db: &dyn QueryExecer,
) -> Result<Vec<String>, InternalError> {
    let tables: Vec<String> = ALL_SCHEMAS.iter().map(|schema| schema.table.to_string()).collect();
    let rows = db
        .query(
            ctx,
            MISSING_TABLES_SQL,
            &[SqlValue::TextArray(Some(tables))],
        )
        .await
        .wrap_step("missing_tables")?;

    Ok(rows
        .into_iter()
        .filter_map(|row| row.into_iter().next().and_then(|value| value.as_str().map(str::to_string)))
        .collect())
}

/// Connects with the manifest's database settings and warns about any table the engine
/// expects but cannot find. The schema itself is owned by migrations elsewhere.
pub async fn setup_postgres(manifest: &Manifest) -> Result<PostgresClient, SetupPostgresError> {
    info!("Setting up postgres for {}", manifest.name);
    let client = PostgresClient::connect(&manifest.database).await?;

    let ctx = OperationContext::new(manifest.organization_id.clone().unwrap_or_default());
    let missing = missing_tables(&ctx, &client).await?;
    if missing.is_empty() {
        info!("Found all {} tables for {}", ALL_SCHEMAS.len(), manifest.name);
    } else {
        warn!("Missing tables for {}: {}", manifest.name, missing.join(", "));
    }

    Ok(client)
}
