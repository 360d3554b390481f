//! Convenient imports for typical `pgdal` usage.
//!
//! ```ignore
//! use pgdal::prelude::*;
//! ```

pub use crate::values;
pub use crate::{
    ColumnValues, ConnectOptions, Connection, Dal, DalConfig, DalError, Direction, FetchOptions,
    Filter, FilterBinding, OperationResult, Order, Page, Record, Truncate, Value,
};
