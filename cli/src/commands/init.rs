use std::path::PathBuf;

use rosterstore::{
    manifest::{
        core::Manifest,
        yaml::{write_manifest, YAML_CONFIG_NAME},
    },
    options::UpsertOptions,
};

use crate::console::{print_error_message, print_success_message};

pub fn handle_init_command(
    project_path: PathBuf,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest_path = project_path.join(YAML_CONFIG_NAME);
    if manifest_path.exists() {
        let message = format!("{} already exists", manifest_path.display());
        print_error_message(&message);
        return Err(message.into());
    }

    let manifest = Manifest {
        name: name.to_string(),
        description: None,
        organization_id: None,
        database: Default::default(),
        features: UpsertOptions::default(),
        batch: Default::default(),
    };

    write_manifest(&manifest, &manifest_path).map_err(|e| {
        print_error_message(&format!("Could not write {}: trace: {}", manifest_path.display(), e));
        e
    })?;

    print_success_message(&format!("Created {}", manifest_path.display()));
    Ok(())
}
