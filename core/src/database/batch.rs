use tracing::debug;

use crate::database::{
    executor::{BatchResults, OperationContext, QueryExecer},
    schema::CompiledStatement,
    sql_value::SqlValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Read back as an affected-row count.
    Exec,
    /// Read back as the single row the statement returns.
    Returning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub kind: StatementKind,
}

/// An ordered queue of statements. Queuing never touches the database; nothing is sent until
/// the batch is dispatched, and then everything goes in one round trip in queue order.
#[derive(Debug, Default)]
pub struct Batch {
    statements: Vec<QueuedStatement>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, sql: impl Into<String>, params: Vec<SqlValue>) {
        self.statements.push(QueuedStatement { sql: sql.into(), params, kind: StatementKind::Exec });
    }

    pub fn queue_returning(&mut self, sql: impl Into<String>, params: Vec<SqlValue>) {
        self.statements.push(QueuedStatement {
            sql: sql.into(),
            params,
            kind: StatementKind::Returning,
        });
    }

    pub fn queue_compiled(&mut self, statement: CompiledStatement) {
        self.queue(statement.sql, statement.params);
    }

    pub fn queue_compiled_returning(&mut self, statement: CompiledStatement) {
        self.queue_returning(statement.sql, statement.params);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[QueuedStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<QueuedStatement> {
        self.statements
    }

    pub async fn dispatch(
        self,
        ctx: &OperationContext,
        db: &dyn QueryExecer,
    ) -> Box<dyn BatchResults> {
        debug!("Dispatching batch of {} statements", self.len());
        db.send_batch(ctx, self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_preserves_order_and_kind() {
        let mut batch = Batch::new();
        assert!(batch.is_empty());

        batch.queue("UPDATE a SET x = 1", vec![]);
        batch.queue_returning("INSERT INTO b (y) VALUES ($1) RETURNING y", vec![SqlValue::text("y")]);
        batch.queue_compiled(CompiledStatement { sql: "DELETE FROM c".to_string(), params: vec![] });

        assert_eq!(batch.len(), 3);
        let kinds: Vec<StatementKind> = batch.statements().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StatementKind::Exec, StatementKind::Returning, StatementKind::Exec]);

        let sql: Vec<String> = batch.into_statements().into_iter().map(|s| s.sql).collect();
        assert_eq!(sql[0], "UPDATE a SET x = 1");
        assert_eq!(sql[2], "DELETE FROM c");
    }
}
