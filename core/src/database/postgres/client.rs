use std::{
    env,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_postgres::PostgresConnectionManager;
use dotenv::dotenv;
use futures::{future::BoxFuture, stream::FuturesOrdered, FutureExt, StreamExt};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::{task, time::timeout};
use tokio_postgres::{config::SslMode, types::ToSql, Client, Config};
use tracing::{debug, error, info};

use crate::{
    database::{
        batch::{Batch, QueuedStatement, StatementKind},
        error::DatabaseError,
        executor::{run_until, BatchResults, OperationContext, QueryExecer},
        sql_value::{row_from_pg, Row, SqlValue},
    },
    manifest::database::DatabaseDetails,
};

type PgConnectionManager = PostgresConnectionManager<MakeTlsConnector>;
type PgConnection = PooledConnection<'static, PgConnectionManager>;

pub fn connection_string(env_name: &str) -> Result<String, env::VarError> {
    dotenv().ok();
    let connection = env::var(env_name)?;
    Ok(connection)
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresConnectionError {
    #[error("The database connection string is wrong please check your environment: {0}")]
    DatabaseConnectionConfigWrong(#[from] env::VarError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] tokio_postgres::Error),

    #[error("Can not connect to the database please make sure your connection string is correct")]
    CanNotConnectToDatabase,

    #[error("Could not parse connection string make sure it is correctly formatted")]
    CouldNotParseConnectionString,

    #[error("Could not create tls connector")]
    CouldNotCreateTlsConnector,
}

/// Pooled Postgres handle.
///
/// A batch checks out one connection and writes every queued statement to it back to back
/// without waiting for the replies, so a whole batch costs a single round trip. The connection
/// goes back to the pool when the cursor is closed or dropped.
pub struct PostgresClient {
    pool: Pool<PgConnectionManager>,
    closed: AtomicBool,
}

impl PostgresClient {
    pub async fn new() -> Result<Self, PostgresConnectionError> {
        Self::connect(&DatabaseDetails::default()).await
    }

    pub async fn connect(details: &DatabaseDetails) -> Result<Self, PostgresConnectionError> {
        async fn _connect(
            details: &DatabaseDetails,
            disable_ssl: bool,
        ) -> Result<PostgresClient, PostgresConnectionError> {
            let connection_str = connection_string(&details.url_env)?;
            let mut config: Config = connection_str
                .parse()
                .map_err(|_| PostgresConnectionError::CouldNotParseConnectionString)?;

            if disable_ssl {
                config.ssl_mode(SslMode::Disable);
            }

            let connector = TlsConnector::builder()
                .build()
                .map_err(|_| PostgresConnectionError::CouldNotCreateTlsConnector)?;
            let tls_connector = MakeTlsConnector::new(connector);

            let connect_timeout = Duration::from_millis(details.connect_timeout_ms);
            let (client, connection) =
                match timeout(connect_timeout, config.connect(tls_connector.clone())).await {
                    Ok(Ok((client, connection))) => (client, connection),
                    Ok(Err(e)) => {
                        // retry without ssl if ssl has been attempted and failed
                        if !disable_ssl &&
                            config.get_ssl_mode() != SslMode::Disable &&
                            !connection_str.contains("sslmode=require")
                        {
                            return Box::pin(_connect(details, true)).await;
                        }
                        error!("Error connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                    Err(e) => {
                        error!("Timeout connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                };

            let connection_handle = task::spawn(connection);

            if client.query_one("SELECT 1", &[]).await.is_err() {
                return Err(PostgresConnectionError::CanNotConnectToDatabase);
            }

            drop(client);
            match connection_handle.await {
                Ok(Ok(())) => (),
                Ok(Err(_)) | Err(_) => return Err(PostgresConnectionError::CanNotConnectToDatabase),
            }

            let manager = PostgresConnectionManager::new(config, tls_connector);
            let pool = Pool::builder()
                .max_size(details.max_pool_size)
                .connection_timeout(connect_timeout)
                .build(manager)
                .await?;

            info!("Connected to postgres with a pool of {} connections", details.max_pool_size);

            Ok(PostgresClient { pool, closed: AtomicBool::new(false) })
        }

        if details.disable_ssl {
            _connect(details, true).await
        } else {
            _connect(details, false).await
        }
    }

    /// Rejects every later checkout with `DatabaseError::ClosedPool`. Connections already
    /// checked out finish what they are doing.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn checkout(&self) -> Result<PgConnection, DatabaseError> {
        if self.is_closed() {
            return Err(DatabaseError::ClosedPool);
        }
        Ok(self.pool.get_owned().await?)
    }
}

fn as_params(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|param| param as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl QueryExecer for PostgresClient {
    async fn exec(
        &self,
        ctx: &OperationContext,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<u64, DatabaseError> {
        ctx.run(async {
            let conn = self.checkout().await?;
            let affected = conn.execute(sql, &as_params(params)).await?;
            Ok::<_, DatabaseError>(affected)
        })
        .await
    }

    async fn query(
        &self,
        ctx: &OperationContext,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<Row>, DatabaseError> {
        ctx.run(async {
            let conn = self.checkout().await?;
            let rows = conn.query(sql, &as_params(params)).await?;
            rows.iter().map(row_from_pg).collect::<Result<Vec<Row>, DatabaseError>>()
        })
        .await
    }

    async fn send_batch(&self, ctx: &OperationContext, batch: Batch) -> Box<dyn BatchResults> {
        let statements = batch.into_statements();
        let conn = match ctx.run(self.checkout()).await {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                debug!("Could not check out a connection for a batch: {}", e);
                return Box::new(PipelinedResults::failed(e, ctx.deadline()));
            }
        };

        debug!("Pipelining {} statements on one connection", statements.len());

        let mut pending = FuturesOrdered::new();
        for statement in statements {
            let conn = Arc::clone(&conn);
            pending.push_back(async move { run_queued(&conn, statement).await }.boxed());
        }

        Box::new(PipelinedResults::new(pending, ctx.deadline()))
    }
}

enum QueuedOutcome {
    Affected(u64),
    Row(Option<Row>),
}

async fn run_queued(
    conn: &Client,
    statement: QueuedStatement,
) -> Result<QueuedOutcome, DatabaseError> {
    let params = as_params(&statement.params);
    match statement.kind {
        StatementKind::Exec => {
            Ok(QueuedOutcome::Affected(conn.execute(statement.sql.as_str(), &params).await?))
        }
        StatementKind::Returning => {
            let row = conn.query_opt(statement.sql.as_str(), &params).await?;
            Ok(QueuedOutcome::Row(row.as_ref().map(row_from_pg).transpose()?))
        }
    }
}

type PendingStatement = BoxFuture<'static, Result<QueuedOutcome, DatabaseError>>;

/// Cursor over an in-flight pipeline. Every queued future holds a handle on the checked-out
/// connection; dropping them on close releases it.
struct PipelinedResults {
    pending: Option<FuturesOrdered<PendingStatement>>,
    checkout_error: Option<DatabaseError>,
    deadline: Option<Instant>,
}

impl PipelinedResults {
    fn new(pending: FuturesOrdered<PendingStatement>, deadline: Option<Instant>) -> Self {
        Self { pending: Some(pending), checkout_error: None, deadline }
    }

    fn failed(error: DatabaseError, deadline: Option<Instant>) -> Self {
        Self { pending: None, checkout_error: Some(error), deadline }
    }

    async fn next(&mut self) -> Result<QueuedOutcome, DatabaseError> {
        if let Some(e) = self.checkout_error.take() {
            return Err(e);
        }
        let Some(pending) = self.pending.as_mut() else {
            return Err(DatabaseError::UnexpectedResult("batch results already closed".to_string()));
        };

        match run_until(self.deadline, pending.next().map(Ok::<_, DatabaseError>)).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => Err(DatabaseError::UnexpectedResult("no more results in batch".to_string())),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl BatchResults for PipelinedResults {
    async fn exec(&mut self) -> Result<u64, DatabaseError> {
        match self.next().await? {
            QueuedOutcome::Affected(n) => Ok(n),
            QueuedOutcome::Row(row) => Ok(row.is_some() as u64),
        }
    }

    async fn query_row(&mut self) -> Result<Row, DatabaseError> {
        match self.next().await? {
            QueuedOutcome::Row(Some(row)) => Ok(row),
            QueuedOutcome::Row(None) => Err(DatabaseError::NoRows),
            QueuedOutcome::Affected(_) => Err(DatabaseError::UnexpectedResult(
                "statement was queued without RETURNING".to_string(),
            )),
        }
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        if let Some(pending) = self.pending.take() {
            if !pending.is_empty() {
                debug!("Closing batch with {} unread results", pending.len());
            }
        }
        self.checkout_error = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after(delay_ms: u64, outcome: QueuedOutcome, handle: Arc<()>) -> PendingStatement {
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            drop(handle);
            Ok(outcome)
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_results_are_read_in_queue_order() {
        let handle = Arc::new(());
        let mut pending = FuturesOrdered::new();
        pending.push_back(after(40, QueuedOutcome::Affected(3), Arc::clone(&handle)));
        pending.push_back(after(5, QueuedOutcome::Row(Some(vec![SqlValue::text("s1")])), Arc::clone(&handle)));
        pending.push_back(after(20, QueuedOutcome::Row(None), Arc::clone(&handle)));

        let mut results = PipelinedResults::new(pending, None);

        assert_eq!(results.exec().await.unwrap(), 3);
        assert_eq!(results.query_row().await.unwrap(), vec![SqlValue::text("s1")]);
        assert!(matches!(results.query_row().await, Err(DatabaseError::NoRows)));
        assert!(matches!(results.exec().await, Err(DatabaseError::UnexpectedResult(_))));
        results.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_statement_does_not_hide_later_results() {
        let mut pending: FuturesOrdered<PendingStatement> = FuturesOrdered::new();
        pending.push_back(async { Err(DatabaseError::ClosedPool) }.boxed());
        pending.push_back(async { Ok(QueuedOutcome::Affected(1)) }.boxed());

        let mut results = PipelinedResults::new(pending, None);

        assert!(matches!(results.exec().await, Err(DatabaseError::ClosedPool)));
        assert_eq!(results.exec().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_checkout_failure_surfaces_on_first_read() {
        let mut results = PipelinedResults::failed(DatabaseError::ClosedPool, None);

        assert!(matches!(results.exec().await, Err(DatabaseError::ClosedPool)));
        assert!(matches!(results.exec().await, Err(DatabaseError::UnexpectedResult(_))));
        results.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_releases_unread_statements() {
        let handle = Arc::new(());
        let mut pending = FuturesOrdered::new();
        for delay_ms in [5, 60_000, 60_000] {
            pending.push_back(after(delay_ms, QueuedOutcome::Affected(1), Arc::clone(&handle)));
        }
        assert_eq!(Arc::strong_count(&handle), 4);

        let mut results = PipelinedResults::new(pending, None);
        assert_eq!(results.exec().await.unwrap(), 1);
        assert_eq!(Arc::strong_count(&handle), 3);

        results.close().await.unwrap();
        assert_eq!(Arc::strong_count(&handle), 1);
        assert!(matches!(results.exec().await, Err(DatabaseError::UnexpectedResult(_))));
    }

    #[tokio::test]
    async fn test_slow_statement_times_out_at_deadline() {
        let handle = Arc::new(());
        let mut pending = FuturesOrdered::new();
        pending.push_back(after(60_000, QueuedOutcome::Affected(1), Arc::clone(&handle)));

        let deadline = Instant::now() + Duration::from_millis(20);
        let mut results = PipelinedResults::new(pending, Some(deadline));

        assert!(matches!(results.exec().await, Err(DatabaseError::Timeout)));
        results.close().await.unwrap();
        assert_eq!(Arc::strong_count(&handle), 1);
    }
}
