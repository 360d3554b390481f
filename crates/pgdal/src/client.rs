//! The connection boundary.
//!
//! [`Connection`] is the capability the execution engine consumes: explicit
//! transaction control, prepare, and bind-and-run. It is implemented for
//! `tokio_postgres::Client`; tests substitute a recording implementation.

use crate::columns::Record;
use crate::error::{DalError, OperationResult, Stage};
use crate::value::{Value, record_from_row};
use tokio_postgres::types::ToSql;

/// A single database connection.
pub trait Connection: Send + Sync {
    /// A statement prepared on this connection.
    type Prepared: Send + Sync;

    /// Open a transaction (`BEGIN`).
    fn begin(&self) -> impl std::future::Future<Output = OperationResult<()>> + Send;

    /// Commit the open transaction.
    fn commit(&self) -> impl std::future::Future<Output = OperationResult<()>> + Send;

    /// Roll back the open transaction.
    fn rollback(&self) -> impl std::future::Future<Output = OperationResult<()>> + Send;

    /// Prepare `sql` (positional `$n` placeholders).
    fn prepare(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = OperationResult<Self::Prepared>> + Send;

    /// Bind `params`, execute, and fetch every row.
    fn query(
        &self,
        stmt: &Self::Prepared,
        params: &[Value],
    ) -> impl std::future::Future<Output = OperationResult<Vec<Record>>> + Send;

    /// Bind `params`, execute, and return the affected row count.
    fn execute(
        &self,
        stmt: &Self::Prepared,
        params: &[Value],
    ) -> impl std::future::Future<Output = OperationResult<u64>> + Send;

    /// Most recent value produced by a sequence in this session.
    fn last_insert_id(&self) -> impl std::future::Future<Output = OperationResult<i64>> + Send;
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Connection for tokio_postgres::Client {
    type Prepared = tokio_postgres::Statement;

    async fn begin(&self) -> OperationResult<()> {
        self.batch_execute("BEGIN")
            .await
            .map_err(|e| DalError::from_db_error(Stage::Transaction, e))
    }

    async fn commit(&self) -> OperationResult<()> {
        self.batch_execute("COMMIT")
            .await
            .map_err(|e| DalError::from_db_error(Stage::Transaction, e))
    }

    async fn rollback(&self) -> OperationResult<()> {
        self.batch_execute("ROLLBACK")
            .await
            .map_err(|e| DalError::from_db_error(Stage::Transaction, e))
    }

    async fn prepare(&self, sql: &str) -> OperationResult<tokio_postgres::Statement> {
        tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(|e| DalError::from_db_error(Stage::Prepare, e))
    }

    async fn query(
        &self,
        stmt: &tokio_postgres::Statement,
        params: &[Value],
    ) -> OperationResult<Vec<Record>> {
        let params = param_refs(params);
        let rows = tokio_postgres::Client::query(self, stmt, &params)
            .await
            .map_err(|e| DalError::from_db_error(Stage::Execute, e))?;
        rows.iter().map(record_from_row).collect()
    }

    async fn execute(
        &self,
        stmt: &tokio_postgres::Statement,
        params: &[Value],
    ) -> OperationResult<u64> {
        let params = param_refs(params);
        tokio_postgres::Client::execute(self, stmt, &params)
            .await
            .map_err(|e| DalError::from_db_error(Stage::Execute, e))
    }

    async fn last_insert_id(&self) -> OperationResult<i64> {
        let row = tokio_postgres::Client::query_one(self, "SELECT LASTVAL()", &[])
            .await
            .map_err(|e| DalError::from_db_error(Stage::Execute, e))?;
        row.try_get(0)
            .map_err(|e| DalError::decode("lastval", e.to_string()))
    }
}
