use std::borrow::Cow;

use bb8::RunError;

/// Failures reported by the database handle or a batch cursor.
#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("closed pool")]
    ClosedPool,

    #[error("conn closed")]
    ConnectionClosed,

    #[error("timed out waiting for a pooled connection")]
    PoolTimeout,

    #[error("context deadline exceeded")]
    Timeout,

    #[error("no rows in result set")]
    NoRows,

    #[error("PgError {0}")]
    Postgres(tokio_postgres::Error),

    #[error("unexpected batch result: {0}")]
    UnexpectedResult(String),

    #[error("could not decode column {column}: {reason}")]
    Decode { column: String, reason: String },
}

impl From<tokio_postgres::Error> for DatabaseError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.is_closed() {
            DatabaseError::ConnectionClosed
        } else {
            DatabaseError::Postgres(e)
        }
    }
}

impl From<RunError<tokio_postgres::Error>> for DatabaseError {
    fn from(e: RunError<tokio_postgres::Error>) -> Self {
        match e {
            RunError::User(e) => e.into(),
            RunError::TimedOut => DatabaseError::PoolTimeout,
        }
    }
}

impl DatabaseError {
    /// The SQLSTATE code reported by the server, if the failure came from Postgres itself.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            DatabaseError::Postgres(e) => e.code().map(|code| code.code()),
            _ => None,
        }
    }
}

/// Error returned by every repository and orchestrator.
///
/// Each step that fails wraps the error with its own label, so the rendered message reads as
/// a path from the outermost step down to the root cause, for example
/// `StudentRepo::upsert_multiple: UserRepo::upsert_multiple: batchResults.Exec: closed pool`.
#[derive(thiserror::Error, Debug)]
pub enum InternalError {
    #[error("{step}: {source}")]
    Step { step: Cow<'static, str>, source: Box<InternalError> },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("rows affected: expected {expected}, got {actual}")]
    RowCountMismatch { expected: &'static str, actual: u64 },

    #[error("field map of {table} is malformed: {names} names for {values} values")]
    InvalidFieldMap { table: &'static str, names: usize, values: usize },

    #[error("{0}")]
    Validation(String),
}

impl InternalError {
    pub fn wrap(self, step: impl Into<Cow<'static, str>>) -> Self {
        InternalError::Step { step: step.into(), source: Box::new(self) }
    }

    /// The innermost error once every step label has been peeled off.
    pub fn root(&self) -> &InternalError {
        match self {
            InternalError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn database_error(&self) -> Option<&DatabaseError> {
        match self.root() {
            InternalError::Database(e) => Some(e),
            _ => None,
        }
    }

    /// Step labels from outermost to innermost.
    pub fn steps(&self) -> Vec<&str> {
        let mut steps = Vec::new();
        let mut current = self;
        while let InternalError::Step { step, source } = current {
            steps.push(step.as_ref());
            current = source;
        }
        steps
    }

    pub fn is_closed_pool(&self) -> bool {
        matches!(self.database_error(), Some(DatabaseError::ClosedPool))
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self.database_error(), Some(DatabaseError::NoRows))
    }
}

pub trait WrapStep<T> {
    fn wrap_step(self, step: impl Into<Cow<'static, str>>) -> Result<T, InternalError>;
}

impl<T, E> WrapStep<T> for Result<T, E>
where
    E: Into<InternalError>,
{
    fn wrap_step(self, step: impl Into<Cow<'static, str>>) -> Result<T, InternalError> {
        self.map_err(|e| e.into().wrap(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_renders_step_path() {
        let err = InternalError::from(DatabaseError::ClosedPool)
            .wrap("batchResults.Exec")
            .wrap("StudentRepo::upsert_multiple");

        assert_eq!(err.to_string(), "StudentRepo::upsert_multiple: batchResults.Exec: closed pool");
        assert_eq!(err.steps(), vec!["StudentRepo::upsert_multiple", "batchResults.Exec"]);
        assert!(err.is_closed_pool());
    }

    #[test]
    fn test_root_of_unwrapped_error_is_itself() {
        let err = InternalError::RowCountMismatch { expected: "exactly 1", actual: 0 };

        assert!(matches!(err.root(), InternalError::RowCountMismatch { actual: 0, .. }));
        assert!(err.steps().is_empty());
        assert!(err.database_error().is_none());
    }

    #[test]
    fn test_wrap_step_on_result() {
        let result: Result<(), DatabaseError> = Err(DatabaseError::NoRows);
        let err = result.wrap_step("batchResults.QueryRow").unwrap_err();

        assert!(err.is_no_rows());
        assert!(!err.is_closed_pool());
        assert_eq!(err.to_string(), "batchResults.QueryRow: no rows in result set");
    }

    #[test]
    fn test_sql_state_only_for_server_errors() {
        assert!(DatabaseError::ClosedPool.sql_state().is_none());
        assert!(DatabaseError::NoRows.sql_state().is_none());
    }
}
