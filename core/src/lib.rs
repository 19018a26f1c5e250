// public
pub mod aggregate;
pub mod database;
pub mod entity;
pub mod manifest;
pub mod options;
pub mod repository;

pub use database::postgres::{
    client::{PostgresClient, PostgresConnectionError},
    setup::{missing_tables, setup_postgres, SetupPostgresError},
};

mod helpers;
pub use helpers::{generate_random_id, generate_row_id};

mod logger;
pub use logger::{parse_log_level, setup_info_logger, setup_logger};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tokio::main as rosterstore_main;
pub use tracing::{error as rosterstore_error, info as rosterstore_info};
