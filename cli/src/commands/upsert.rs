use std::path::Path;

use rosterstore::{
    aggregate::{ParentAggregateService, StudentAggregateService},
    setup_postgres,
};

use crate::{
    cli_interface::ProjectArgs,
    commands::{load_manifest, manifest_path, operation_context},
    console::{print_error_message, print_success_message, print_warn_message},
    input::InputFile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertTarget {
    Students,
    Parents,
}

pub async fn handle_upsert_command(
    file: &Path,
    project: &ProjectArgs,
    target: UpsertTarget,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = load_manifest(&manifest_path(project))?;
    let ctx = operation_context(&manifest, project)?;
    let options = manifest.upsert_options();

    let input = InputFile::read(file).map_err(|e| {
        print_error_message(&format!("Could not read {}: trace: {}", file.display(), e));
        e
    })?;
    let (students, parents) = input.into_aggregates();

    let count = match target {
        UpsertTarget::Students => students.len(),
        UpsertTarget::Parents => parents.len(),
    };
    if count == 0 {
        print_warn_message(&format!("Nothing to upsert in {}", file.display()));
        return Ok(());
    }

    let client = setup_postgres(&manifest).await.map_err(|e| {
        print_error_message(&format!("Could not connect to Postgres, make sure your connection string is mapping in the .env correctly: trace: {}", e));
        e
    })?;

    let result = match target {
        UpsertTarget::Students => {
            StudentAggregateService::default().upsert_multiple(&ctx, &client, &options, &students).await
        }
        UpsertTarget::Parents => {
            ParentAggregateService::default().upsert_multiple(&ctx, &client, &options, &parents).await
        }
    };
    client.close();

    result.map_err(|e| {
        print_error_message(&format!("Upsert failed, nothing after the failing step was written: {}", e));
        e
    })?;

    print_success_message(&format!(
        "Upserted {} {}",
        count,
        match target {
            UpsertTarget::Students => "students",
            UpsertTarget::Parents => "parents",
        }
    ));
    Ok(())
}
