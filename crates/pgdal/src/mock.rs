//! Recording in-memory connection for unit tests.

use crate::client::Connection;
use crate::columns::Record;
use crate::error::{DalError, OperationResult};
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One call made on the connection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Begin,
    Commit,
    Rollback,
    Prepare(String),
    Query(String, Vec<Value>),
    Execute(String, Vec<Value>),
    LastInsertId,
}

/// A step that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Begin,
    Commit,
    Rollback,
    Prepare,
    Query,
    Execute,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    rows: VecDeque<Vec<Record>>,
    affected: VecDeque<u64>,
    failures: Vec<(Step, DalError)>,
    last_id: i64,
}

#[derive(Default)]
pub(crate) struct MockConnection {
    state: Mutex<State>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next `query`.
    pub(crate) fn returning(self, rows: Vec<Record>) -> Self {
        self.state.lock().unwrap().rows.push_back(rows);
        self
    }

    /// Queue the count returned by the next `execute`.
    pub(crate) fn affecting(self, n: u64) -> Self {
        self.state.lock().unwrap().affected.push_back(n);
        self
    }

    /// Fail the next call of `step` with `err`.
    pub(crate) fn failing(self, step: Step, err: DalError) -> Self {
        self.state.lock().unwrap().failures.push((step, err));
        self
    }

    pub(crate) fn with_last_id(self, id: i64) -> Self {
        self.state.lock().unwrap().last_id = id;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// SQL and parameters of every query/execute call, in order.
    pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query(sql, params) | Call::Execute(sql, params) => Some((sql, params)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call, step: Step) -> OperationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.iter().position(|(s, _)| *s == step) {
            Some(pos) => Err(state.failures.remove(pos).1),
            None => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    type Prepared = String;

    async fn begin(&self) -> OperationResult<()> {
        self.record(Call::Begin, Step::Begin)
    }

    async fn commit(&self) -> OperationResult<()> {
        self.record(Call::Commit, Step::Commit)
    }

    async fn rollback(&self) -> OperationResult<()> {
        self.record(Call::Rollback, Step::Rollback)
    }

    async fn prepare(&self, sql: &str) -> OperationResult<String> {
        self.record(Call::Prepare(sql.to_string()), Step::Prepare)?;
        Ok(sql.to_string())
    }

    async fn query(&self, stmt: &String, params: &[Value]) -> OperationResult<Vec<Record>> {
        self.record(Call::Query(stmt.clone(), params.to_vec()), Step::Query)?;
        Ok(self.state.lock().unwrap().rows.pop_front().unwrap_or_default())
    }

    async fn execute(&self, stmt: &String, params: &[Value]) -> OperationResult<u64> {
        self.record(Call::Execute(stmt.clone(), params.to_vec()), Step::Execute)?;
        Ok(self.state.lock().unwrap().affected.pop_front().unwrap_or(0))
    }

    async fn last_insert_id(&self) -> OperationResult<i64> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::LastInsertId);
        Ok(state.last_id)
    }
}
