use std::path::{Path, PathBuf};

use rosterstore::{
    database::OperationContext,
    manifest::{
        core::Manifest,
        yaml::{read_manifest, YAML_CONFIG_NAME},
    },
};

use crate::{cli_interface::ProjectArgs, console::print_error_message};

pub mod init;
pub mod print_sql;
pub mod soft_delete;
pub mod upsert;

pub fn manifest_path(project: &ProjectArgs) -> PathBuf {
    match &project.config {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(YAML_CONFIG_NAME),
    }
}

pub fn load_manifest(path: &Path) -> Result<Manifest, Box<dyn std::error::Error>> {
    read_manifest(path).map_err(|e| {
        print_error_message(&format!(
            "Could not read {} please make sure it exists and is valid: trace: {}",
            path.display(),
            e
        ));
        e.into()
    })
}

pub fn operation_context(
    manifest: &Manifest,
    project: &ProjectArgs,
) -> Result<OperationContext, Box<dyn std::error::Error>> {
    manifest.operation_context(project.organization.as_deref()).ok_or_else(|| {
        let message = "No organization given, pass --organization or set organization_id in the config";
        print_error_message(message);
        message.into()
    })
}
