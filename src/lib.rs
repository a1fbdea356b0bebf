//! cppdb is a uniform, synchronous connectivity layer over heterogeneous
//! SQL engines.
//!
//! A [`ConnectionsManager`] turns a connection string of the form
//! `driver:[key=value;]*` into pooled [`Connection`]s, loading the
//! engine's driver module dynamically on first use. Connections carry a
//! per-connection prepared [`Statement`] cache keyed by SQL text.
//! Pooling, idle eviction and caching are tuned through the reserved
//! `@pool_size`, `@pool_max_idle` and `@stmt_cache_size` properties.
//!
//! ```no_run
//! use cppdb::ConnectionsManager;
//!
//! fn main() -> Result<(), cppdb::Error> {
//!     let manager = ConnectionsManager::new();
//!     let mut conn = manager.open("sqlite3:db=test.db;@pool_size=8")?;
//!
//!     let mut tx = conn.transaction()?;
//!     let mut st = tx.prepare("INSERT INTO users(name) VALUES(?)")?;
//!     st.bind_str(1, "alice")?;
//!     st.exec()?;
//!     drop(st);
//!     tx.commit()?;
//!     Ok(())
//! }
//! ```
//!
//! Engine adapters implement the traits in [`backend`]; the [`mock`]
//! module ships an in-memory adapter for tests.

pub use cppdb_core::backend;
pub use cppdb_core::error::{self, Error, Result};
pub use cppdb_core::mock;
pub use cppdb_core::{
    Connection, ConnectionInfo, ConnectionsManager, Driver, DriverManager, Pool, Statement,
    StatementCache, Transaction,
};
