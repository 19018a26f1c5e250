use std::{
    env,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use dotenv::dotenv;
use regex::Regex;
use tracing::{error, info};

use crate::manifest::core::Manifest;

pub const YAML_CONFIG_NAME: &str = "rosterstore.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Could not substitute env variables: {0}")]
    CouldNotSubstituteEnvVariables(#[from] regex::Error),

    #[error("Environment variable {0} not found")]
    EnvironmentVariableNotFound(String),

    #[error("Could not validate manifest: {0}")]
    CouldNotValidateManifest(String),
}

fn substitute_env_variables(contents: &str) -> Result<String, ReadManifestError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;

    for caps in re.captures_iter(contents) {
        let var_name = &caps[1];
        if env::var(var_name).is_err() {
            error!("Environment variable {} not found", var_name);
            return Err(ReadManifestError::EnvironmentVariableNotFound(var_name.to_string()));
        }
    }

    let result = re.replace_all(contents, |caps: &regex::Captures| {
        env::var(&caps[1]).unwrap_or_default()
    });
    Ok(result.into_owned())
}

fn validate_manifest(manifest: &Manifest) -> Result<(), ReadManifestError> {
    if manifest.name.trim().is_empty() {
        return Err(ReadManifestError::CouldNotValidateManifest("name can not be empty".to_string()));
    }
    if manifest.database.max_pool_size == 0 {
        return Err(ReadManifestError::CouldNotValidateManifest(
            "database.max_pool_size must be at least 1".to_string(),
        ));
    }
    if manifest.organization_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
        return Err(ReadManifestError::CouldNotValidateManifest(
            "organization_id can not be empty when set".to_string(),
        ));
    }
    Ok(())
}

pub fn parse_manifest(contents: &str) -> Result<Manifest, ReadManifestError> {
    let contents = substitute_env_variables(contents)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

pub fn read_manifest(file_path: &Path) -> Result<Manifest, ReadManifestError> {
    dotenv().ok();

    let mut file = File::open(file_path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let manifest = parse_manifest(&contents)?;
    info!("Loaded manifest {} from {}", manifest.name, file_path.display());
    Ok(manifest)
}

#[derive(thiserror::Error, Debug)]
pub enum WriteManifestError {
    #[error("Could not serialize manifest: {0}")]
    CouldNotSerialize(#[from] serde_yaml::Error),

    #[error("Could not write file: {0}")]
    CouldNotWriteFile(#[from] std::io::Error),
}

pub fn write_manifest(manifest: &Manifest, file_path: &Path) -> Result<(), WriteManifestError> {
    let yaml = serde_yaml::to_string(manifest)?;
    let mut file = File::create(file_path)?;
    file.write_all(yaml.as_bytes())?;
    Ok(())
}
