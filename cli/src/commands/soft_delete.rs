use rosterstore::{aggregate::StudentRepo, setup_postgres};

use crate::{
    cli_interface::ProjectArgs,
    commands::{load_manifest, manifest_path, operation_context},
    console::{print_error_message, print_success_message},
};

pub async fn handle_soft_delete_students_command(
    ids: &[String],
    project: &ProjectArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = load_manifest(&manifest_path(project))?;
    let ctx = operation_context(&manifest, project)?;

    let client = setup_postgres(&manifest).await.map_err(|e| {
        print_error_message(&format!("Could not connect to Postgres, make sure your connection string is mapping in the .env correctly: trace: {}", e));
        e
    })?;

    let result = StudentRepo::default().soft_delete_by_ids(&ctx, &client, ids).await;
    client.close();

    result.map_err(|e| {
        print_error_message(&format!("Could not soft delete students: {}", e));
        e
    })?;

    print_success_message(&format!("Soft deleted {} students", ids.len()));
    Ok(())
}
