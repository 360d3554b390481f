//! Transactional statement execution.
//!
//! Every statement runs in its own transaction:
//! begin → prepare → bind → execute → commit. A failure after begin rolls the
//! transaction back; if the rollback fails too, its message is folded into the
//! returned error.

use crate::client::Connection;
use crate::columns::Record;
use crate::error::{DalError, OperationResult};
use crate::placeholders::{self, Compiled};
use crate::statement::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Rows,
    Affected,
}

/// Outcome of a committed statement.
#[derive(Debug, Default)]
struct Executed {
    rows: Vec<Record>,
    affected: u64,
}

/// Runs statements on a borrowed connection, if there is one.
pub(crate) struct Engine<'a, C> {
    conn: Option<&'a C>,
    max_logged_sql: Option<usize>,
}

impl<'a, C: Connection> Engine<'a, C> {
    pub(crate) fn new(conn: Option<&'a C>, max_logged_sql: Option<usize>) -> Self {
        Self {
            conn,
            max_logged_sql,
        }
    }

    /// Run `stmt` and return every row it produced.
    pub(crate) async fn fetch(&self, op: &'static str, stmt: &Statement) -> OperationResult<Vec<Record>> {
        self.run(op, stmt, Mode::Rows).await.map(|done| done.rows)
    }

    /// Run `stmt` and return the affected row count.
    pub(crate) async fn execute(&self, op: &'static str, stmt: &Statement) -> OperationResult<u64> {
        self.run(op, stmt, Mode::Affected)
            .await
            .map(|done| done.affected)
    }

    async fn run(&self, op: &'static str, stmt: &Statement, mode: Mode) -> OperationResult<Executed> {
        let conn = self.conn.ok_or_else(|| {
            DalError::ConnectionUnavailable("no database connection established".to_string())
        })?;
        let compiled = placeholders::compile(stmt)?;
        tracing::debug!(
            target: "pgdal.sql",
            op,
            sql = %self.log_sql(&compiled.sql),
            params = compiled.params.len(),
            "executing statement"
        );

        conn.begin().await?;
        match Self::execute_in(conn, &compiled, mode).await {
            Ok(done) => {
                conn.commit().await?;
                tracing::trace!(target: "pgdal", op, affected = done.affected, "committed");
                Ok(done)
            }
            Err(err) => {
                tracing::warn!(target: "pgdal", op, error = %err, "statement failed, rolling back");
                match conn.rollback().await {
                    Ok(()) => Err(err),
                    Err(rollback) => {
                        tracing::error!(target: "pgdal", op, error = %rollback, "rollback failed");
                        Err(err.with_rollback_failure(&rollback))
                    }
                }
            }
        }
    }

    async fn execute_in(conn: &C, compiled: &Compiled, mode: Mode) -> OperationResult<Executed> {
        let prepared = conn.prepare(&compiled.sql).await?;
        match mode {
            Mode::Rows => {
                let rows = conn.query(&prepared, &compiled.params).await?;
                Ok(Executed {
                    affected: rows.len() as u64,
                    rows,
                })
            }
            Mode::Affected => {
                let affected = conn.execute(&prepared, &compiled.params).await?;
                Ok(Executed {
                    rows: Vec::new(),
                    affected,
                })
            }
        }
    }

    fn log_sql(&self, sql: &str) -> String {
        match self.max_logged_sql {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

/// Longest prefix of `sql` within `max_bytes` that ends on a char boundary.
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockConnection, Step};
    use crate::value::Value;
    use crate::values;

    fn stmt() -> Statement {
        let mut s = Statement::new("UPDATE t SET a = :a");
        s.bind("a", 1);
        s
    }

    #[tokio::test]
    async fn success_commits_once() {
        let conn = MockConnection::new().returning(vec![values! { "a" => 1 }]);
        let rows = Engine::new(Some(&conn), None)
            .fetch("update", &stmt())
            .await
            .unwrap();
        assert_eq!(rows, vec![values! { "a" => 1 }]);
        assert_eq!(
            conn.calls(),
            vec![
                Call::Begin,
                Call::Prepare("UPDATE t SET a = $1".to_string()),
                Call::Query("UPDATE t SET a = $1".to_string(), vec![Value::Int(1)]),
                Call::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn execute_returns_affected_count() {
        let conn = MockConnection::new().affecting(3);
        let n = Engine::new(Some(&conn), None)
            .execute("raw_query", &stmt())
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(conn.calls().last(), Some(&Call::Commit));
    }

    #[tokio::test]
    async fn failure_rolls_back_exactly_once() {
        let conn = MockConnection::new().failing(
            Step::Execute,
            DalError::Execution {
                sqlstate: Some("23505".to_string()),
                message: "duplicate key".to_string(),
            },
        );
        let err = Engine::new(Some(&conn), None)
            .execute("raw_query", &stmt())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        let calls = conn.calls();
        assert_eq!(calls.iter().filter(|c| **c == Call::Rollback).count(), 1);
        assert!(!calls.contains(&Call::Commit));
    }

    #[tokio::test]
    async fn prepare_failure_rolls_back() {
        let conn = MockConnection::new().failing(
            Step::Prepare,
            DalError::Prepare {
                sqlstate: Some("42601".to_string()),
                message: "syntax error".to_string(),
            },
        );
        let err = Engine::new(Some(&conn), None)
            .fetch("fetch", &stmt())
            .await
            .unwrap_err();
        assert!(matches!(err, DalError::Prepare { .. }));
        assert_eq!(
            conn.calls(),
            vec![
                Call::Begin,
                Call::Prepare("UPDATE t SET a = $1".to_string()),
                Call::Rollback
            ]
        );
    }

    #[tokio::test]
    async fn failed_rollback_is_folded_into_error() {
        let conn = MockConnection::new()
            .failing(Step::Query, DalError::execution("boom"))
            .failing(Step::Rollback, DalError::Transaction("gone".to_string()));
        let err = Engine::new(Some(&conn), None)
            .fetch("update", &stmt())
            .await
            .unwrap_err();
        assert!(err.is_execution());
        assert!(err.message().contains("boom"));
        assert!(err.message().contains("rollback failed"));
    }

    #[tokio::test]
    async fn begin_failure_is_returned_without_rollback() {
        let conn = MockConnection::new()
            .failing(Step::Begin, DalError::Transaction("cannot begin".to_string()));
        let err = Engine::new(Some(&conn), None)
            .fetch("fetch", &stmt())
            .await
            .unwrap_err();
        assert!(matches!(err, DalError::Transaction(_)));
        assert_eq!(conn.calls(), vec![Call::Begin]);
    }

    #[tokio::test]
    async fn commit_failure_is_returned() {
        let conn = MockConnection::new()
            .failing(Step::Commit, DalError::Transaction("serialization failure".to_string()));
        let err = Engine::new(Some(&conn), None)
            .execute("raw_query", &stmt())
            .await
            .unwrap_err();
        assert!(matches!(err, DalError::Transaction(_)));
    }

    #[tokio::test]
    async fn missing_connection() {
        let err = Engine::<MockConnection>::new(None, None)
            .fetch("fetch", &stmt())
            .await
            .unwrap_err();
        assert!(err.is_connection_unavailable());
    }

    #[tokio::test]
    async fn unbound_placeholder_never_reaches_connection() {
        let conn = MockConnection::new();
        let err = Engine::new(Some(&conn), None)
            .fetch("raw_fetch", &Statement::new("SELECT * FROM t WHERE a = :a"))
            .await
            .unwrap_err();
        assert!(matches!(err, DalError::Bind(_)));
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn logged_sql_is_truncated_on_char_boundary() {
        let engine = Engine::<MockConnection>::new(None, Some(8));
        assert_eq!(engine.log_sql("SELECT 1"), "SELECT 1");
        assert_eq!(engine.log_sql("SELECT 'ää'"), "SELECT '...");
        assert_eq!(truncate_sql_bytes("ää", 3), "ä");
    }
}
