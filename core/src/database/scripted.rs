//! In-memory [`QueryExecer`] that records every statement it receives and answers with
//! scripted outcomes. Used for dry runs, where nothing should reach a real database, and by the
//! unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::database::{
    batch::{Batch, QueuedStatement, StatementKind},
    error::DatabaseError,
    executor::{BatchResults, OperationContext, QueryExecer},
    sql_value::{Row, SqlValue},
};

#[derive(Debug)]
pub enum ScriptedOutcome {
    Affected(u64),
    Row(Row),
    Fail(DatabaseError),
}

/// One round trip as the database would see it.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Batch(Vec<QueuedStatement>),
    Single(QueuedStatement),
}

#[derive(Debug, Default)]
struct ScriptState {
    dispatches: Vec<Dispatch>,
    batches: Vec<Vec<QueuedStatement>>,
    execs: Vec<QueuedStatement>,
    outcomes: VecDeque<ScriptedOutcome>,
    query_results: VecDeque<Vec<Row>>,
    close_errors: VecDeque<DatabaseError>,
    reads: usize,
    closes: usize,
}

/// Unscripted reads succeed: an `exec` reports one affected row and a `query_row` reports
/// `NoRows`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDb {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptState {
    fn record_single(&mut self, statement: QueuedStatement) {
        self.dispatches.push(Dispatch::Single(statement.clone()));
        self.execs.push(statement);
    }
}

fn lock(state: &Mutex<ScriptState>) -> MutexGuard<'_, ScriptState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next read, across batches and single statements alike.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) -> &Self {
        lock(&self.state).outcomes.push_back(outcome);
        self
    }

    pub fn push_query_result(&self, rows: Vec<Row>) -> &Self {
        lock(&self.state).query_results.push_back(rows);
        self
    }

    pub fn fail_next_close(&self, error: DatabaseError) -> &Self {
        lock(&self.state).close_errors.push_back(error);
        self
    }

    pub fn batches(&self) -> Vec<Vec<QueuedStatement>> {
        lock(&self.state).batches.clone()
    }

    pub fn execs(&self) -> Vec<QueuedStatement> {
        lock(&self.state).execs.clone()
    }

    /// Batches and single statements interleaved in the order they were sent.
    pub fn dispatches(&self) -> Vec<Dispatch> {
        lock(&self.state).dispatches.clone()
    }

    /// SQL of every batched statement in dispatch order.
    pub fn batched_sql(&self) -> Vec<String> {
        lock(&self.state).batches.iter().flatten().map(|s| s.sql.clone()).collect()
    }

    /// Results read from cursors so far.
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }
}

#[async_trait]
impl QueryExecer for ScriptedDb {
    async fn exec(
        &self,
        _ctx: &OperationContext,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<u64, DatabaseError> {
        let mut state = lock(&self.state);
        state.record_single(QueuedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
            kind: StatementKind::Exec,
        });
        match state.outcomes.pop_front() {
            None | Some(ScriptedOutcome::Row(_)) => Ok(1),
            Some(ScriptedOutcome::Affected(n)) => Ok(n),
            Some(ScriptedOutcome::Fail(e)) => Err(e),
        }
    }

    async fn query(
        &self,
        _ctx: &OperationContext,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<Row>, DatabaseError> {
        let mut state = lock(&self.state);
        state.record_single(QueuedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
            kind: StatementKind::Returning,
        });
        Ok(state.query_results.pop_front().unwrap_or_default())
    }

    async fn send_batch(&self, _ctx: &OperationContext, batch: Batch) -> Box<dyn BatchResults> {
        let statements = batch.into_statements();
        let pending = statements.len();
        let mut state = lock(&self.state);
        state.dispatches.push(Dispatch::Batch(statements.clone()));
        state.batches.push(statements);
        drop(state);
        Box::new(ScriptedResults { state: Arc::clone(&self.state), pending, closed: false })
    }
}

struct ScriptedResults {
    state: Arc<Mutex<ScriptState>>,
    pending: usize,
    closed: bool,
}

impl ScriptedResults {
    fn next_outcome(&mut self) -> Result<Option<ScriptedOutcome>, DatabaseError> {
        if self.closed {
            return Err(DatabaseError::UnexpectedResult("batch results already closed".to_string()));
        }
        if self.pending == 0 {
            return Err(DatabaseError::UnexpectedResult("no more results in batch".to_string()));
        }
        self.pending -= 1;

        let mut state = lock(&self.state);
        state.reads += 1;
        Ok(state.outcomes.pop_front())
    }
}

#[async_trait]
impl BatchResults for ScriptedResults {
    async fn exec(&mut self) -> Result<u64, DatabaseError> {
        match self.next_outcome()? {
            None | Some(ScriptedOutcome::Row(_)) => Ok(1),
            Some(ScriptedOutcome::Affected(n)) => Ok(n),
            Some(ScriptedOutcome::Fail(e)) => Err(e),
        }
    }

    async fn query_row(&mut self) -> Result<Row, DatabaseError> {
        match self.next_outcome()? {
            None => Err(DatabaseError::NoRows),
            Some(ScriptedOutcome::Row(row)) => Ok(row),
            Some(ScriptedOutcome::Affected(_)) => Err(DatabaseError::UnexpectedResult(
                "statement did not return a row".to_string(),
            )),
            Some(ScriptedOutcome::Fail(e)) => Err(e),
        }
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut state = lock(&self.state);
        state.closes += 1;
        match state.close_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_batch_succeeds() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        let mut batch = Batch::new();
        batch.queue("UPDATE a SET x = 1", vec![]);
        batch.queue_returning("INSERT INTO b DEFAULT VALUES RETURNING id", vec![]);

        let mut results = batch.dispatch(&ctx, &db).await;
        assert_eq!(results.exec().await.unwrap(), 1);
        assert!(matches!(results.query_row().await, Err(DatabaseError::NoRows)));
        assert!(matches!(results.exec().await, Err(DatabaseError::UnexpectedResult(_))));
        results.close().await.unwrap();
        results.close().await.unwrap();

        assert_eq!(db.closes(), 1);
        assert_eq!(db.reads(), 2);
        assert_eq!(db.batched_sql().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_outcomes_are_read_in_order() {
        let db = ScriptedDb::new();
        db.push_outcome(ScriptedOutcome::Affected(0))
            .push_outcome(ScriptedOutcome::Fail(DatabaseError::ClosedPool));
        let ctx = OperationContext::new("org-1");

        let mut batch = Batch::new();
        batch.queue("UPDATE a SET x = 1", vec![]);
        batch.queue("UPDATE a SET x = 2", vec![]);

        let mut results = batch.dispatch(&ctx, &db).await;
        assert_eq!(results.exec().await.unwrap(), 0);
        assert!(matches!(results.exec().await, Err(DatabaseError::ClosedPool)));
    }

    #[tokio::test]
    async fn test_dispatches_keep_batches_and_single_statements_interleaved() {
        let db = ScriptedDb::new();
        let ctx = OperationContext::new("org-1");

        let mut first = Batch::new();
        first.queue("UPDATE a SET x = 1", vec![]);
        first.dispatch(&ctx, &db).await.close().await.unwrap();

        db.exec(&ctx, "INSERT INTO c VALUES ($1)", &[SqlValue::text("c1")]).await.unwrap();

        let mut second = Batch::new();
        second.queue("UPDATE b SET y = 2", vec![]);
        second.dispatch(&ctx, &db).await.close().await.unwrap();

        let order: Vec<String> = db
            .dispatches()
            .into_iter()
            .map(|d| match d {
                Dispatch::Batch(statements) => format!("batch:{}", statements[0].sql),
                Dispatch::Single(statement) => format!("single:{}", statement.sql),
            })
            .collect();
        assert_eq!(
            order,
            vec![
                "batch:UPDATE a SET x = 1",
                "single:INSERT INTO c VALUES ($1)",
                "batch:UPDATE b SET y = 2",
            ]
        );
        assert_eq!(db.execs().len(), 1);
        assert_eq!(db.batches().len(), 2);
    }
}
