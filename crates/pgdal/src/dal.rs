//! The data-access facade.
//!
//! [`Dal`] owns one connection and exposes table-level operations. Each
//! operation builds its statement, runs it in its own transaction and returns
//! an [`OperationResult`]; nothing here panics or aborts on database errors.
//!
//! ```ignore
//! use pgdal::prelude::*;
//!
//! # async fn demo() -> OperationResult<()> {
//! let mut dal = Dal::connect(ConnectOptions::from_env(), DalConfig::default()).await?;
//! let rows = dal.insert("users", &values! { "name" => "a", "age" => 3 }, "id").await?;
//! let active = dal
//!     .fetch("users", &["id", "name"], &FetchOptions::new().filter(Filter::by(values! { "age" => ">2" })))
//!     .await?;
//! # Ok(()) }
//! ```

use crate::clause::{FetchOptions, Filter, Order};
use crate::client::Connection;
use crate::columns::{ColumnValues, Record};
use crate::config::{ConnectOptions, DalConfig};
use crate::engine::Engine;
use crate::error::{DalError, OperationResult, Stage};
use crate::ident;
use crate::statement::{self, Truncate};
use crate::value::Value;

/// Table-level data access over a single connection.
///
/// Operations take `&mut self`: one `Dal` runs one transaction at a time.
pub struct Dal<C: Connection = tokio_postgres::Client> {
    conn: Option<C>,
    config: DalConfig,
    options: Option<ConnectOptions>,
}

impl Dal {
    /// Connect with `options`.
    ///
    /// With incomplete credentials no connection is attempted and a
    /// disconnected `Dal` is returned; its operations fail with
    /// [`DalError::ConnectionUnavailable`]. A failed connection attempt is
    /// returned as an error.
    pub async fn connect(options: ConnectOptions, config: DalConfig) -> OperationResult<Self> {
        if !options.has_credentials() {
            tracing::warn!(
                target: "pgdal",
                host = %options.host,
                database = %options.database,
                "incomplete credentials, not connecting"
            );
            return Ok(Self {
                conn: None,
                config,
                options: Some(options),
            });
        }

        let (client, connection) = options
            .to_pg_config()
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| {
                tracing::error!(target: "pgdal", host = %options.host, error = %e, "connection failed");
                DalError::from_db_error(Stage::Connect, e)
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "pgdal", error = %e, "connection closed with error");
            }
        });
        tracing::info!(
            target: "pgdal",
            host = %options.host,
            port = options.port,
            database = %options.database,
            "connected"
        );

        Ok(Self {
            conn: Some(client),
            config,
            options: Some(options),
        })
    }
}

impl<C: Connection> Dal<C> {
    /// Wrap an established connection.
    pub fn new(conn: C, config: DalConfig) -> Self {
        Self {
            conn: Some(conn),
            config,
            options: None,
        }
    }

    /// A `Dal` without a connection.
    pub fn disconnected(config: DalConfig) -> Self {
        Self {
            conn: None,
            config,
            options: None,
        }
    }

    pub fn connection(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Options this `Dal` was connected with, if it was built by [`Dal::connect`].
    pub fn options(&self) -> Option<&ConnectOptions> {
        self.options.as_ref()
    }

    pub fn config(&self) -> &DalConfig {
        &self.config
    }

    fn engine(&self) -> Engine<'_, C> {
        Engine::new(self.conn.as_ref(), self.config.max_logged_sql)
    }

    /// Insert one row and return it as persisted.
    ///
    /// The insert returns `id_field`; the row is then read back with a
    /// `fetch` filtered by that identifier.
    pub async fn insert(
        &mut self,
        table: &str,
        data: &ColumnValues,
        id_field: &str,
    ) -> OperationResult<Vec<Record>> {
        ident::column(id_field)?;
        let mut stmt = statement::insert(table, data)?;
        stmt.returning(id_field);

        let returned = self.engine().fetch("insert", &stmt).await?;
        let id = returned
            .first()
            .and_then(|row| row.values().next())
            .cloned()
            .ok_or_else(|| {
                DalError::execution(format!("insert into {table} returned no {id_field}"))
            })?;

        let options = FetchOptions::new().filter(Filter::key(id_field, id));
        self.fetch::<&str>(table, &["*"], &options).await
    }

    /// Insert every row of `rows`, pairing each positionally with `columns`.
    ///
    /// Returns one result per row, in order. A row whose length differs from
    /// `columns` fails with [`DalError::Validation`] without touching the
    /// database.
    pub async fn insert_list<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        rows: &[Vec<Value>],
        id_field: &str,
    ) -> Vec<OperationResult<Vec<Record>>> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let result = match ColumnValues::zip(columns, row.iter().cloned()) {
                Some(data) => self.insert(table, &data, id_field).await,
                None => Err(DalError::validation(format!(
                    "row has {} values for {} columns",
                    row.len(),
                    columns.len()
                ))),
            };
            results.push(result);
        }
        results
    }

    /// Insert `data`, or update the row identified by `data[id_field]` when
    /// the insert fails at execution.
    pub async fn insert_or_update(
        &mut self,
        table: &str,
        data: &ColumnValues,
        id_field: &str,
    ) -> OperationResult<Vec<Record>> {
        match self.insert(table, data, id_field).await {
            Err(err) if err.is_execution() => {
                tracing::debug!(target: "pgdal", table, error = %err, "insert failed, updating instead");
                let id = data.get(id_field).cloned().ok_or_else(|| {
                    DalError::empty_input(format!("no value for identifier field {id_field}"))
                })?;
                let filter = Filter::key(id_field, id.coerce_integer());
                self.update(table, data, &filter).await
            }
            other => other,
        }
    }

    /// Update rows matching `filter`; returns the updated rows.
    pub async fn update(
        &mut self,
        table: &str,
        data: &ColumnValues,
        filter: &Filter,
    ) -> OperationResult<Vec<Record>> {
        let stmt = statement::update(table, data, filter, self.config.filter_binding)?;
        self.engine().fetch("update", &stmt).await
    }

    /// Select `columns` (all when empty) from `table`.
    pub async fn fetch<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        options: &FetchOptions,
    ) -> OperationResult<Vec<Record>> {
        let stmt = statement::select(table, columns, options, self.config.filter_binding)?;
        self.engine().fetch("fetch", &stmt).await
    }

    /// Every row of `table` in `order`.
    pub async fn fetch_all(&mut self, table: &str, order: &Order) -> OperationResult<Vec<Record>> {
        let options = FetchOptions::new().order(order.clone());
        self.fetch::<&str>(table, &[], &options).await
    }

    /// Delete rows whose `field` matches `value` (sign prefixes apply).
    pub async fn delete(
        &mut self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> OperationResult<u64> {
        let stmt = statement::delete(table, field, &value.into(), self.config.filter_binding)?;
        self.engine().execute("delete", &stmt).await
    }

    /// Empty `table` with `TRUNCATE`.
    pub async fn delete_all(&mut self, table: &str, options: Truncate) -> OperationResult<u64> {
        let stmt = statement::truncate(table, options)?;
        self.engine().execute("delete_all", &stmt).await
    }

    /// Run caller SQL with named placeholders; returns the affected row count.
    pub async fn raw_query(&mut self, sql: &str, values: &ColumnValues) -> OperationResult<u64> {
        self.engine()
            .execute("raw_query", &statement::raw(sql, values))
            .await
    }

    /// Run caller SQL with named placeholders; returns its rows.
    pub async fn raw_fetch(&mut self, sql: &str, values: &ColumnValues) -> OperationResult<Vec<Record>> {
        self.engine()
            .fetch("raw_fetch", &statement::raw(sql, values))
            .await
    }

    /// Last sequence value produced in this session.
    pub async fn last_insert_id(&mut self) -> OperationResult<i64> {
        match &self.conn {
            Some(conn) => conn.last_insert_id().await,
            None => Err(DalError::ConnectionUnavailable(
                "no database connection established".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests;
