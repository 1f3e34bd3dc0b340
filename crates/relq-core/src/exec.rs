//! The driver boundary.
//!
//! The engine requires exactly four things of a store: acquire a
//! connection, execute text for rows-affected or a scalar, execute text for
//! a row cursor (with named-parameter binding and output readback), and
//! begin/commit/rollback a transaction. Everything else — pooling, wire
//! protocol, stored-procedure discovery — belongs to the driver.

use crate::error::Error;
use crate::params::ParameterCollection;
use crate::value::Value;

/// A source of connections.
pub trait Driver: Send + Sync {
    /// Connection type produced by this driver.
    type Connection: Connection;

    /// Acquire a connection. Scoped: callers release it on every exit
    /// path by dropping it.
    fn connect(&self) -> Result<Self::Connection, Error>;
}

/// One database connection with at most one active transaction.
pub trait Connection {
    /// Cursor type produced by queries.
    type Rows: RowCursor;

    /// Execute a statement, returning the affected row count.
    fn execute(&mut self, sql: &str, params: &ParameterCollection) -> Result<u64, Error>;

    /// Execute a statement, returning the first column of the first row
    /// (`Value::Null` when the statement yields nothing).
    fn query_scalar(&mut self, sql: &str, params: &ParameterCollection) -> Result<Value, Error>;

    /// Execute a statement, returning a row cursor plus the values of any
    /// output parameters the statement populated.
    fn query(&mut self, sql: &str, params: &ParameterCollection)
        -> Result<QueryOutput<Self::Rows>, Error>;

    /// Begin a transaction on this connection.
    fn begin(&mut self) -> Result<(), Error>;

    /// Commit the active transaction.
    fn commit(&mut self) -> Result<(), Error>;

    /// Roll back the active transaction.
    fn rollback(&mut self) -> Result<(), Error>;
}

/// A forward-only cursor over one result set.
pub trait RowCursor {
    /// Column names of the result set, in ordinal order.
    fn columns(&self) -> &[String];

    /// Advance to the next row; `false` when exhausted.
    fn advance(&mut self) -> Result<bool, Error>;

    /// Read the value at `ordinal` on the current row.
    fn value(&self, ordinal: usize) -> Result<Value, Error>;
}

/// A cursor together with output-parameter values.
///
/// Output parameters are populated by a statement preceding the row
/// stream (both paging strategies count into `RecordCount` first), so
/// drivers can surface them alongside the cursor.
pub struct QueryOutput<R: RowCursor> {
    /// The row cursor.
    pub rows: R,
    /// `(name, value)` pairs for populated output parameters.
    pub outputs: Vec<(String, Value)>,
}

impl<R: RowCursor> QueryOutput<R> {
    /// Read one output parameter by name.
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}
