use std::path::Path;

use rosterstore::{
    aggregate::{ParentAggregateService, StudentAggregateService},
    database::{
        scripted::{Dispatch, ScriptedDb},
        OperationContext, QueuedStatement,
    },
    manifest::core::Manifest,
    options::UpsertOptions,
};

use crate::{
    cli_interface::ProjectArgs,
    commands::{load_manifest, manifest_path},
    console::{print_batch_header, print_error_message, print_warn_message},
    input::InputFile,
};

const DRY_RUN_ORGANIZATION: &str = "dry-run";

fn render_statement(statement: &QueuedStatement) -> String {
    let params = statement.params.iter().map(|p| format!("{:?}", p)).collect::<Vec<_>>().join(", ");
    format!("{};\n  -- params: [{}]", statement.sql, params)
}

/// Every batch the input would dispatch, in dispatch order. Nothing leaves the process.
pub async fn dry_run(
    input: InputFile,
    ctx: &OperationContext,
    options: &UpsertOptions,
) -> Result<Vec<Vec<QueuedStatement>>, Box<dyn std::error::Error>> {
    let db = ScriptedDb::new();
    let (students, parents) = input.into_aggregates();

    if !students.is_empty() {
        StudentAggregateService::default().upsert_multiple(ctx, &db, options, &students).await?;
    }
    if !parents.is_empty() {
        ParentAggregateService::default().upsert_multiple(ctx, &db, options, &parents).await?;
    }

    // single statements, such as the bulk enrollment insert, are shown as their own batches
    let batches = db
        .dispatches()
        .into_iter()
        .map(|dispatch| match dispatch {
            Dispatch::Batch(statements) => statements,
            Dispatch::Single(statement) => vec![statement],
        })
        .collect();
    Ok(batches)
}

pub async fn handle_print_sql_command(
    file: &Path,
    project: &ProjectArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = manifest_path(project);
    let manifest: Option<Manifest> = if path.exists() { Some(load_manifest(&path)?) } else { None };
    let options = manifest.as_ref().map(Manifest::upsert_options).unwrap_or_default();
    let ctx = manifest
        .as_ref()
        .and_then(|m| m.operation_context(project.organization.as_deref()))
        .unwrap_or_else(|| {
            OperationContext::new(project.organization.as_deref().unwrap_or(DRY_RUN_ORGANIZATION))
        });

    let input = InputFile::read(file).map_err(|e| {
        print_error_message(&format!("Could not read {}: trace: {}", file.display(), e));
        e
    })?;

    let batches = dry_run(input, &ctx, &options).await?;
    if batches.is_empty() {
        print_warn_message(&format!("Nothing to write in {}", file.display()));
        return Ok(());
    }

    for (index, batch) in batches.iter().enumerate() {
        print_batch_header(index, batch.len());
        for statement in batch {
            println!("{}", render_statement(statement));
        }
    }
    Ok(())
}
