use hashlink::LruCache;

use crate::backend;

/// Per-connection prepared statement cache, keyed by exact SQL text.
///
/// Deliberately keyed by the verbatim query string, not a normalized or
/// hashed form: callers must reuse identical text to benefit. The cache is
/// owned by exactly one connection and is not synchronized.
#[derive(Default)]
pub struct StatementCache {
    inner: Option<LruCache<String, Box<dyn backend::Statement>>>,
}

impl StatementCache {
    /// An inactive cache; [`set_size`](Self::set_size) activates it.
    pub fn new() -> Self {
        StatementCache { inner: None }
    }

    /// Activate caching with capacity `capacity`.
    ///
    /// Effective once: a no-op when already active or when `capacity` is 0.
    pub fn set_size(&mut self, capacity: usize) {
        if capacity != 0 && self.inner.is_none() {
            self.inner = Some(LruCache::new(capacity));
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of statements currently cached.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a statement to the cache.
    ///
    /// The statement is reset to its neutral state first; one that fails
    /// to reset is dropped instead of cached. Re-inserting an existing key
    /// replaces the cached entry and marks it most recently used; growing
    /// past capacity evicts the least recently used entry.
    pub fn put(&mut self, mut statement: Box<dyn backend::Statement>) {
        let Some(cache) = self.inner.as_mut() else {
            return;
        };
        if statement.reset().is_err() {
            return;
        }
        let sql = statement.sql_query().to_owned();
        cache.insert(sql, statement);
    }

    /// Remove and return the cached statement for an exact SQL-text match.
    ///
    /// A fetched statement is no longer tracked until `put` back.
    pub fn fetch(&mut self, sql: &str) -> Option<Box<dyn backend::Statement>> {
        self.inner.as_mut()?.remove(sql)
    }

    /// Drop every cached statement; the cache stays active.
    pub fn clear(&mut self) {
        if let Some(cache) = self.inner.as_mut() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Connection, Driver};
    use crate::mock::MockDriver;
    use crate::options::ConnectionInfo;

    fn connection() -> Box<dyn Connection> {
        let driver = MockDriver::new("mock");
        let info: ConnectionInfo = "mock:".parse().unwrap();
        driver.open(&info).unwrap()
    }

    fn serial_of(statement: &mut dyn backend::Statement) -> i64 {
        let mut rows = statement.query().unwrap();
        assert!(rows.next().unwrap());
        rows.fetch_i64(0).unwrap().unwrap()
    }

    #[test]
    fn fetch_returns_the_statement_that_was_put() {
        let mut conn = connection();
        let mut cache = StatementCache::new();
        cache.set_size(4);

        let mut st = conn.real_prepare("SELECT statement_serial").unwrap();
        let serial = serial_of(st.as_mut());
        cache.put(st);

        let mut cached = cache.fetch("SELECT statement_serial").unwrap();
        assert_eq!(serial_of(cached.as_mut()), serial);

        // fetched statements are no longer tracked
        assert!(cache.fetch("SELECT statement_serial").is_none());
    }

    #[test]
    fn lru_entry_is_evicted_at_capacity() {
        let mut conn = connection();
        let mut cache = StatementCache::new();
        cache.set_size(1);

        cache.put(conn.real_prepare("SELECT a").unwrap());
        cache.put(conn.real_prepare("SELECT b").unwrap());

        assert!(cache.fetch("SELECT a").is_none());
        assert!(cache.fetch("SELECT b").is_some());
    }

    #[test]
    fn put_replaces_entry_with_the_same_sql() {
        let mut conn = connection();
        let mut cache = StatementCache::new();
        cache.set_size(4);

        cache.put(conn.real_prepare("SELECT statement_serial").unwrap());
        let mut replacement = conn.real_prepare("SELECT statement_serial").unwrap();
        let serial = serial_of(replacement.as_mut());
        cache.put(replacement);

        assert_eq!(cache.len(), 1);
        let mut cached = cache.fetch("SELECT statement_serial").unwrap();
        assert_eq!(serial_of(cached.as_mut()), serial);
    }

    #[test]
    fn set_size_is_effective_only_once() {
        let mut conn = connection();
        let mut cache = StatementCache::new();
        cache.set_size(1);
        cache.set_size(16);

        cache.put(conn.real_prepare("SELECT a").unwrap());
        cache.put(conn.real_prepare("SELECT b").unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_but_keeps_the_cache_active() {
        let mut conn = connection();
        let mut cache = StatementCache::new();
        cache.set_size(4);

        cache.put(conn.real_prepare("SELECT a").unwrap());
        cache.put(conn.real_prepare("SELECT b").unwrap());
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.is_active());

        cache.put(conn.real_prepare("SELECT a").unwrap());
        assert!(cache.fetch("SELECT a").is_some());
    }

    #[test]
    fn inactive_cache_drops_statements() {
        let mut conn = connection();
        let mut cache = StatementCache::new();

        assert!(!cache.is_active());
        cache.put(conn.real_prepare("SELECT a").unwrap());
        assert!(cache.fetch("SELECT a").is_none());

        cache.set_size(0);
        assert!(!cache.is_active());
    }
}
