use std::sync::Arc;

use crate::backend;
use crate::cache::StatementCache;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::options::{ConnectionInfo, DEFAULT_STMT_CACHE_SIZE, KEY_STMT_CACHE_SIZE};
use crate::pool::PoolInner;
use crate::statement::Statement;
use crate::transaction::Transaction;

/// A live backend connection bundled with its statement cache and a handle
/// to the driver that produced it.
///
/// The driver handle keeps the driver object, and through it any loaded
/// shared object, mapped for as long as the connection is alive, even
/// after the driver manager has evicted its registry entry.
pub(crate) struct Live {
    pub(crate) backend: Box<dyn backend::Connection>,
    pub(crate) cache: StatementCache,
    _driver: Option<Arc<Driver>>,
}

impl Live {
    pub(crate) fn new(
        backend: Box<dyn backend::Connection>,
        info: &ConnectionInfo,
        driver: Option<Arc<Driver>>,
    ) -> Result<Self> {
        let mut cache = StatementCache::new();
        let size = info.get_int(KEY_STMT_CACHE_SIZE, DEFAULT_STMT_CACHE_SIZE)?;
        if size > 0 {
            cache.set_size(size as usize);
        }
        Ok(Live {
            backend,
            cache,
            _driver: driver,
        })
    }
}

/// A database connection, either leased from a [`Pool`](crate::Pool) or
/// owned outright.
///
/// A pooled connection returns to its pool on drop; an unpooled one closes
/// its backend connection. Connections are used by one thread at a time.
pub struct Connection {
    live: Option<Live>,
    pool: Option<Arc<PoolInner>>,
}

impl Connection {
    pub(crate) fn new(live: Live, pool: Option<Arc<PoolInner>>) -> Self {
        Connection {
            live: Some(live),
            pool,
        }
    }

    fn live_ref(&self) -> Result<&Live> {
        self.live.as_ref().ok_or(Error::EmptyHandle)
    }

    fn live_mut(&mut self) -> Result<&mut Live> {
        self.live.as_mut().ok_or(Error::EmptyHandle)
    }

    /// `false` for an empty handle.
    pub fn is_open(&self) -> bool {
        self.live.is_some()
    }

    /// Start a transaction.
    pub fn begin(&mut self) -> Result<()> {
        self.live_mut()?.backend.begin()
    }

    /// Commit the active transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.live_mut()?.backend.commit()
    }

    /// Roll back the active transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.live_mut()?.backend.rollback()
    }

    /// Start a scoped transaction that rolls back on drop unless
    /// committed.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Transaction::new(self)
    }

    /// Prepare `sql`, reusing the connection's statement cache when it is
    /// active.
    ///
    /// A statement served from the cache (or freshly prepared while the
    /// cache is active) returns to the cache when dropped.
    pub fn prepare(&mut self, sql: &str) -> Result<Statement<'_>> {
        let live = self.live.as_mut().ok_or(Error::EmptyHandle)?;

        if !live.cache.is_active() {
            let raw = live.backend.real_prepare(sql)?;
            return Ok(Statement::new(raw, None));
        }

        let raw = match live.cache.fetch(sql) {
            Some(raw) => raw,
            None => live.backend.real_prepare(sql)?,
        };
        Ok(Statement::new(raw, Some(&mut live.cache)))
    }

    /// Escape a string for inclusion in a SQL query.
    pub fn escape(&self, s: &str) -> Result<String> {
        self.live_ref()?.backend.escape(s)
    }

    /// The driver name of the underlying backend.
    pub fn driver(&self) -> Result<&str> {
        Ok(self.live_ref()?.backend.driver())
    }

    /// The engine name of the underlying backend.
    pub fn engine(&self) -> Result<&str> {
        Ok(self.live_ref()?.backend.engine())
    }

    /// Close the backend connection instead of returning it to the pool.
    pub fn close(mut self) {
        self.pool = None;
        self.live = None;
    }
}

impl Default for Connection {
    /// An empty handle: every operation fails with [`Error::EmptyHandle`].
    fn default() -> Self {
        Connection {
            live: None,
            pool: None,
        }
    }
}

/// Returns the connection to the pool it was leased from, if any.
impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            if let Some(pool) = self.pool.take() {
                pool.put(live);
            }
        }
    }
}
