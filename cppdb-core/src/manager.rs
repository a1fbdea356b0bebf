use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::driver::DriverManager;
use crate::error::Result;
use crate::options::{ConnectionInfo, DEFAULT_POOL_SIZE, KEY_POOL_SIZE};
use crate::pool::Pool;

/// Facade over the driver manager and one pool per connection string.
///
/// `open` with the same connection string reuses the same pool; `gc`
/// drops pools and drivers nothing references anymore. Construct one per
/// application and share it behind an `Arc`; there is no global instance.
pub struct ConnectionsManager {
    drivers: Arc<DriverManager>,
    pools: Mutex<HashMap<String, Pool>>,
}

impl Default for ConnectionsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionsManager {
    pub fn new() -> Self {
        Self::with_driver_manager(Arc::new(DriverManager::new()))
    }

    /// Build on an existing driver manager, sharing its loaded drivers.
    pub fn with_driver_manager(drivers: Arc<DriverManager>) -> Self {
        ConnectionsManager {
            drivers,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// The driver manager serving this facade.
    pub fn driver_manager(&self) -> &Arc<DriverManager> {
        &self.drivers
    }

    /// Open a connection for `connection_string`, pooled unless the string
    /// sets `@pool_size=0`.
    pub fn open(&self, connection_string: &str) -> Result<Connection> {
        self.open_info(connection_string.parse()?)
    }

    fn open_info(&self, info: ConnectionInfo) -> Result<Connection> {
        if info.get_int(KEY_POOL_SIZE, DEFAULT_POOL_SIZE)? == 0 {
            return self.drivers.connect(&info);
        }

        let pool = {
            let mut pools = self.pools.lock();
            match pools.get(info.connection_string()) {
                Some(pool) => pool.clone(),
                None => {
                    let key = info.connection_string().to_owned();
                    let pool = Pool::new(info, Arc::clone(&self.drivers))?;
                    pools.insert(key, pool.clone());
                    pool
                }
            }
        };
        // connecting may block; the pool map stays unlocked
        pool.open()
    }

    /// Purge stale idle connections, drop unreferenced pools and collect
    /// unused drivers.
    pub fn gc(&self) {
        let pools: Vec<Pool> = self.pools.lock().values().cloned().collect();
        for pool in &pools {
            pool.gc();
        }
        drop(pools);

        let removed = {
            let mut pools = self.pools.lock();
            let mut removed = Vec::new();
            pools.retain(|_, pool| {
                // one handle is the map's own; the rest are user clones
                // and leased connections
                if pool.handle_count() > 1 {
                    true
                } else {
                    removed.push(pool.clone());
                    false
                }
            });
            removed
        };
        // idle backend teardown happens outside the map lock
        drop(removed);

        self.drivers.collect_unused();
    }

    /// Number of pools currently retained.
    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }
}
