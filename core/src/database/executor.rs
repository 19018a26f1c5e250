use std::{
    future::Future,
    time::{Duration, Instant},
};

use async_trait::async_trait;

use crate::database::{
    batch::Batch,
    error::DatabaseError,
    sql_value::{Row, SqlValue},
};

/// Tenant and cancellation scope of one repository or orchestrator call.
///
/// The organization id is bound as `resource_path` on every row written and every soft delete
/// issued under this context.
#[derive(Debug, Clone)]
pub struct OperationContext {
    organization_id: String,
    deadline: Option<Instant>,
}

impl OperationContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self { organization_id: organization_id.into(), deadline: None }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Runs `fut` bounded by the deadline, if any.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        run_until(self.deadline, fut).await
    }
}

pub(crate) async fn run_until<F, T>(deadline: Option<Instant>, fut: F) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), fut)
            .await
            .map_err(|_| DatabaseError::Timeout)?,
        None => fut.await,
    }
}

/// Database handle the repositories run against.
#[async_trait]
pub trait QueryExecer: Send + Sync {
    /// Executes a single statement and returns the number of affected rows.
    async fn exec(
        &self,
        ctx: &OperationContext,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<u64, DatabaseError>;

    async fn query(
        &self,
        ctx: &OperationContext,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<Row>, DatabaseError>;

    /// Sends every queued statement in one pipelined round trip. Never fails up front: a
    /// failure to reach the database is reported by the first read from the cursor.
    async fn send_batch(&self, ctx: &OperationContext, batch: Batch) -> Box<dyn BatchResults>;
}

/// Ordered cursor over the results of one dispatched batch.
///
/// The i-th read returns the outcome of the i-th queued statement. Results must be read in
/// order and the cursor must be closed once the caller is done with it, which hands the
/// connection back to the pool.
#[async_trait]
pub trait BatchResults: Send {
    /// Affected row count of the next statement.
    async fn exec(&mut self) -> Result<u64, DatabaseError>;

    /// The single row returned by the next statement. `DatabaseError::NoRows` when the
    /// statement returned nothing.
    async fn query_row(&mut self) -> Result<Row, DatabaseError>;

    async fn close(&mut self) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_without_deadline() {
        let ctx = OperationContext::new("org-1");
        let value = ctx.run(async { Ok::<_, DatabaseError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(ctx.organization_id(), "org-1");
        assert!(!ctx.is_expired());
    }

    #[tokio::test]
    async fn test_run_past_deadline_times_out() {
        let ctx = OperationContext::new("org-1").with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, DatabaseError>(())
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::Timeout)));
    }
}
