use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use rosterstore::{parse_log_level, setup_info_logger, setup_logger};

use crate::{
    cli_interface::{Commands, CLI},
    commands::{
        init::handle_init_command,
        print_sql::handle_print_sql_command,
        soft_delete::handle_soft_delete_students_command,
        upsert::{handle_upsert_command, UpsertTarget},
    },
    console::print_error_message,
};

mod cli_interface;
mod commands;
mod console;
mod input;

fn resolve_path(override_path: &Option<String>) -> Result<PathBuf, String> {
    match override_path {
        Some(path) => {
            let path = PathBuf::from_str(path).map_err(|_| "Invalid path provided.".to_string())?;
            Ok(path)
        }
        None => std::env::current_dir().map_err(|_| "Failed to get current directory.".to_string()),
    }
}

fn setup_logging(log_level: &Option<String>) {
    match log_level {
        Some(level) => setup_logger(parse_log_level(level)),
        None => setup_info_logger(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CLI::parse();

    match &cli.command {
        Commands::Init { name, path } => {
            let resolved_path = resolve_path(path).map_err(|e| {
                print_error_message(&e);
                e
            })?;
            handle_init_command(resolved_path, name)
        }
        Commands::UpsertStudents { file, project } => {
            setup_logging(&cli.log_level);
            handle_upsert_command(&PathBuf::from(file), project, UpsertTarget::Students).await
        }
        Commands::UpsertParents { file, project } => {
            setup_logging(&cli.log_level);
            handle_upsert_command(&PathBuf::from(file), project, UpsertTarget::Parents).await
        }
        Commands::SoftDeleteStudents { ids, project } => {
            setup_logging(&cli.log_level);
            handle_soft_delete_students_command(ids, project).await
        }
        Commands::PrintSql { file, project } => {
            handle_print_sql_command(&PathBuf::from(file), project).await
        }
    }
}
