pub mod batch;
pub mod core;
pub mod database;
pub mod yaml;
