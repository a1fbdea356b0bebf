//! The interface implemented by engine adapters (SQLite, PostgreSQL,
//! MySQL, ODBC, ...).
//!
//! Everything above this module is engine-agnostic: the pool, the driver
//! manager and the statement cache only ever see these trait objects.
//! Adapters translate their native client API into this interface and
//! nothing more; type coercion beyond textual round-tripping is out of
//! scope.

use crate::error::{Error, Result};
use crate::options::ConnectionInfo;

/// Factory for backend connections of one engine.
pub trait Driver: Send + Sync + 'static {
    /// The driver name, e.g. `sqlite3` or `odbc`.
    fn name(&self) -> &str;

    /// Open a new backend connection.
    fn open(&self, info: &ConnectionInfo) -> Result<Box<dyn Connection>>;
}

/// A single backend connection.
///
/// Connections are used by one thread at a time; implementations are not
/// required to synchronize internally.
pub trait Connection: Send + 'static {
    /// Start a new transaction. Never called while another transaction is
    /// active on this connection.
    fn begin(&mut self) -> Result<()>;

    /// Commit the active transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the active transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Prepare `sql`, bypassing any statement cache. Must not return a
    /// dangling statement on success.
    fn real_prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Escape a string for inclusion in a SQL query.
    fn escape(&self, _s: &str) -> Result<String> {
        Err(Error::NotSupported("escape"))
    }

    /// The driver name, e.g. `odbc`.
    fn driver(&self) -> &str;

    /// The engine name, e.g. `mssql`; differs from [`driver`](Self::driver)
    /// when one driver fronts multiple engines.
    fn engine(&self) -> &str;
}

/// A prepared statement.
///
/// Placeholder indices start at 1; binding an out-of-range index fails
/// with [`Error::InvalidPlaceholder`].
pub trait Statement: Send + 'static {
    /// Reset to the neutral state, as before any binds or execution.
    fn reset(&mut self) -> Result<()>;

    /// The SQL text this statement was prepared from, verbatim. Used as
    /// the statement-cache key.
    fn sql_query(&self) -> &str;

    fn bind_i64(&mut self, col: usize, value: i64) -> Result<()>;
    fn bind_u64(&mut self, col: usize, value: u64) -> Result<()>;
    fn bind_f64(&mut self, col: usize, value: f64) -> Result<()>;
    fn bind_str(&mut self, col: usize, value: &str) -> Result<()>;
    fn bind_bytes(&mut self, col: usize, value: &[u8]) -> Result<()>;

    /// Bind a timestamp given as `YYYY-MM-DD HH:MM:SS` text. Values
    /// round-trip textually; a malformed timestamp fails with
    /// [`Error::ValueConversion`].
    fn bind_tm(&mut self, col: usize, value: &str) -> Result<()>;

    fn bind_null(&mut self, col: usize) -> Result<()>;

    /// The last sequence value generated for an inserted row. Engines
    /// without sequence support fail with [`Error::NotSupported`]; engines
    /// that do not use named sequences ignore `sequence`.
    fn sequence_last(&mut self, sequence: &str) -> Result<i64>;

    /// Rows affected by the last [`exec`](Self::exec).
    fn affected(&mut self) -> Result<u64>;

    /// Execute a query and return its result rows.
    fn query(&mut self) -> Result<Box<dyn Rows + '_>>;

    /// Execute a statement that returns no rows.
    fn exec(&mut self) -> Result<()>;
}

/// A query result cursor. Column indices start at 0.
pub trait Rows: Send {
    /// Advance to the next row; `false` once the result is exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Number of columns; valid before the first [`next`](Self::next).
    fn cols(&self) -> usize;

    fn is_null(&self, col: usize) -> Result<bool>;

    // `None` means the column holds SQL NULL.
    fn fetch_i64(&self, col: usize) -> Result<Option<i64>>;
    fn fetch_u64(&self, col: usize) -> Result<Option<u64>>;
    fn fetch_f64(&self, col: usize) -> Result<Option<f64>>;
    fn fetch_string(&self, col: usize) -> Result<Option<String>>;
    fn fetch_bytes(&self, col: usize) -> Result<Option<Vec<u8>>>;

    /// Fetch a timestamp as its `YYYY-MM-DD HH:MM:SS` text; a column
    /// value that is not a timestamp fails with
    /// [`Error::ValueConversion`].
    fn fetch_tm(&self, col: usize) -> Result<Option<String>>;

    /// Resolve a column name to its index; valid before the first
    /// [`next`](Self::next).
    fn name_to_column(&self, name: &str) -> Result<usize>;

    /// The name of column `col`.
    fn column_to_name(&self, col: usize) -> Result<String>;
}

/// Owned backend connection as it crosses the driver-module boundary.
pub type BoxedConnection = Box<dyn Connection>;

/// The factory symbol a driver module exports as
/// `cppdb_<name>_get_connection`.
///
/// Returns a pointer produced by `Box::into_raw(Box::new(boxed))`, or null
/// when the connection could not be established. The module must be built
/// against the same `cppdb-core` version as the host.
pub type ConnectFunction =
    unsafe extern "C" fn(info: *const ConnectionInfo) -> *mut BoxedConnection;
