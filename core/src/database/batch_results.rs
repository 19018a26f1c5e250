use tracing::{debug, warn};

use crate::database::{
    batch::Batch,
    error::{InternalError, WrapStep},
    executor::{BatchResults, OperationContext, QueryExecer},
    field_map::{scan_into, FieldMap},
};

/// What each statement of a batch must report to count as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessContract {
    /// Single-row upserts and inserts.
    ExactlyOneRow,
    AtLeastOneRow,
    /// The statement must hand back a row.
    ReturningRow,
    /// Only a driver error fails the statement, e.g. soft deletes that may match nothing.
    NoContract,
}

impl SuccessContract {
    pub fn check(self, affected: u64) -> Result<(), InternalError> {
        match self {
            SuccessContract::ExactlyOneRow if affected != 1 => {
                Err(InternalError::RowCountMismatch { expected: "exactly 1", actual: affected })
            }
            SuccessContract::AtLeastOneRow if affected == 0 => {
                Err(InternalError::RowCountMismatch { expected: "at least 1", actual: affected })
            }
            _ => Ok(()),
        }
    }
}

/// Reads a dispatched batch in order, stopping at the first failure.
///
/// Whatever happens, [`BatchConsumer::finish`] closes the cursor. Statements after the first
/// failure are never read.
pub struct BatchConsumer {
    results: Box<dyn BatchResults>,
    consumed: usize,
}

impl BatchConsumer {
    pub fn new(results: Box<dyn BatchResults>) -> Self {
        Self { results, consumed: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Reads the next `n` results, each of which must satisfy `contract`.
    pub async fn expect(&mut self, n: usize, contract: SuccessContract) -> Result<(), InternalError> {
        for _ in 0..n {
            let index = self.consumed;
            self.consumed += 1;

            if contract == SuccessContract::ReturningRow {
                self.results.query_row().await.wrap_step("batchResults.QueryRow")?;
                continue;
            }

            let affected = self.results.exec().await.wrap_step("batchResults.Exec")?;
            if let Err(e) = contract.check(affected) {
                debug!("Batch statement {} broke its success contract: {}", index, e);
                return Err(e.wrap("batchResults.Exec"));
            }
        }

        Ok(())
    }

    /// Reads the next `n` results as returned rows and scans each into a fresh `E`.
    pub async fn returning<E>(&mut self, n: usize) -> Result<Vec<E>, InternalError>
    where
        E: FieldMap + Default,
    {
        let mut entities = Vec::with_capacity(n);
        for _ in 0..n {
            self.consumed += 1;
            let row = self.results.query_row().await.wrap_step("batchResults.QueryRow")?;
            entities.push(scan_into::<E>(row).wrap_step("batchResults.QueryRow")?);
        }

        Ok(entities)
    }

    /// Closes the cursor. A close failure only surfaces when `outcome` was a success.
    pub async fn finish<T>(
        mut self,
        outcome: Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let closed = self.results.close().await;
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(InternalError::from(e).wrap("batchResults.Close")),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_error)) => {
                warn!("Closing batch results after a failed statement also failed: {}", close_error);
                Err(e)
            }
        }
    }
}

/// Reads `n` results under `contract`, then closes the cursor.
pub async fn consume_all(
    results: Box<dyn BatchResults>,
    n: usize,
    contract: SuccessContract,
) -> Result<(), InternalError> {
    let mut consumer = BatchConsumer::new(results);
    let outcome = consumer.expect(n, contract).await;
    consumer.finish(outcome).await
}

/// Reads `n` returned rows into entities, then closes the cursor.
pub async fn consume_returning<E>(
    results: Box<dyn BatchResults>,
    n: usize,
) -> Result<Vec<E>, InternalError>
where
    E: FieldMap + Default,
{
    let mut consumer = BatchConsumer::new(results);
    let outcome = consumer.returning::<E>(n).await;
    consumer.finish(outcome).await
}

/// Dispatches `batch` and consumes every result under `contract`. An empty batch is a no-op
/// that never reaches the database.
pub async fn send_and_consume(
    ctx: &OperationContext,
    db: &dyn QueryExecer,
    batch: Batch,
    contract: SuccessContract,
) -> Result<(), InternalError> {
    if batch.is_empty() {
        return Ok(());
    }

    let n = batch.len();
    let results = batch.dispatch(ctx, db).await;
    consume_all(results, n, contract).await
}
