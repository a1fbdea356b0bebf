//! Core of cppdb: a uniform, synchronous abstraction over heterogeneous
//! SQL engines.
//!
//! The pieces fit together as follows: a [`ConnectionsManager`] resolves a
//! connection string to a [`Pool`], which leases [`Connection`]s; the pool
//! asks the [`DriverManager`] to mint new backend connections, dynamically
//! loading the engine's driver module on first use. A dropped connection
//! returns to its pool instead of closing, and a dropped [`Statement`]
//! returns to its connection's [`StatementCache`].
//!
//! Engine adapters live behind the narrow traits in [`backend`]; this
//! crate performs no SQL parsing and no network I/O of its own.

pub mod backend;
mod cache;
mod connection;
mod driver;
pub mod error;
mod manager;
pub mod mock;
mod options;
mod pool;
mod shared_object;
mod statement;
mod transaction;

pub use self::cache::StatementCache;
pub use self::connection::Connection;
pub use self::driver::{Driver, DriverManager};
pub use self::error::{Error, Result};
pub use self::manager::ConnectionsManager;
pub use self::options::ConnectionInfo;
pub use self::pool::Pool;
pub use self::statement::Statement;
pub use self::transaction::Transaction;
