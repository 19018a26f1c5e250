pub mod batch;
pub mod batch_results;
mod error;
pub mod executor;
pub mod field_map;
pub mod postgres;
pub mod query_builder;
pub mod schema;
pub mod scripted;
pub mod sql_value;

pub use batch::{Batch, QueuedStatement, StatementKind};
pub use batch_results::{
    consume_all, consume_returning, send_and_consume, BatchConsumer, SuccessContract,
};
pub use error::{DatabaseError, InternalError, WrapStep};
pub use executor::{BatchResults, OperationContext, QueryExecer};
pub use field_map::{scan_into, FieldMap};
pub use schema::{ColumnRole, ColumnSpec, CompiledStatement, OmitRule, TableSchema, UpdatePolicy};
pub use sql_value::{FromSqlValue, IntoSqlValue, Row, SqlValue};
