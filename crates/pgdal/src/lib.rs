//! # pgdal
//!
//! A small data-access layer for Postgres.
//!
//! ## Features
//!
//! - **Table-level operations**: insert (with read-back), insert-or-update, update,
//!   fetch, delete and truncate over plain column → value maps
//! - **Filter DSL**: sign prefixes on values (`">10"`, `"!x"`, `"%abc"`) pick the
//!   comparison operator; raw fragments with named placeholders are accepted too
//! - **Named placeholders**: statements use `:name`, compiled to `$n` before they
//!   reach the driver
//! - **One transaction per operation**: commit on success, rollback on any failure
//! - **No panics**: every operation returns an [`OperationResult`]
//!
//! ```ignore
//! use pgdal::prelude::*;
//!
//! let mut dal = Dal::connect(ConnectOptions::from_env(), DalConfig::default()).await?;
//!
//! // UPDATE users SET status=$1 WHERE id <> $2 RETURNING *
//! let rows = dal
//!     .update("users", &values! { "status" => "active" }, &Filter::by(values! { "!id" => 5 }))
//!     .await?;
//!
//! // SELECT id, name FROM users WHERE age > $1 ORDER BY name ASC LIMIT 10 OFFSET 0
//! let page = FetchOptions::new()
//!     .filter(Filter::by(values! { "age" => ">30" }))
//!     .order(Order::new().asc("name"))
//!     .limit(10);
//! let rows = dal.fetch("users", &["id", "name"], &page).await?;
//! ```

pub mod clause;
pub mod client;
pub mod columns;
pub mod comparator;
pub mod config;
pub mod dal;
mod engine;
pub mod error;
pub mod ident;
pub mod placeholders;
pub mod prelude;
pub mod statement;
pub mod value;

#[cfg(test)]
mod mock;

pub use clause::{
    Combinator, Direction, FetchOptions, Filter, FilterBinding, Limit, Order, Page,
};
pub use client::Connection;
pub use columns::{ColumnValues, Record};
pub use comparator::{Comparator, Operator};
pub use config::{ConnectOptions, DalConfig};
pub use dal::Dal;
pub use error::{DalError, OperationResult, Stage};
pub use statement::{Statement, Truncate};
pub use value::Value;
