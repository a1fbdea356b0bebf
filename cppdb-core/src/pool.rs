use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::connection::{Connection, Live};
use crate::driver::DriverManager;
use crate::error::Result;
use crate::options::{
    ConnectionInfo, DEFAULT_POOL_MAX_IDLE, DEFAULT_POOL_SIZE, KEY_POOL_MAX_IDLE, KEY_POOL_SIZE,
};

/// A pool of idle backend connections for one connection string.
///
/// Bounded by `@pool_size` (default 16) and `@pool_max_idle` seconds
/// (default 600). Reuse is LIFO: the most recently returned connection is
/// handed out first. Cloning shares the same pool.
#[derive(Clone)]
pub struct Pool(Arc<PoolInner>);

struct Idle {
    live: Live,
    last_used: Instant,
}

pub(crate) struct PoolInner {
    info: ConnectionInfo,
    limit: usize,
    life_time: Duration,
    drivers: Arc<DriverManager>,
    idle: Mutex<VecDeque<Idle>>,
}

impl Pool {
    /// Create a pool for `info`, minting connections through `drivers`.
    pub fn new(info: ConnectionInfo, drivers: Arc<DriverManager>) -> Result<Self> {
        let limit = info.get_int(KEY_POOL_SIZE, DEFAULT_POOL_SIZE)?.max(0);
        let life_time = info.get_int(KEY_POOL_MAX_IDLE, DEFAULT_POOL_MAX_IDLE)?.max(0);

        Ok(Pool(Arc::new(PoolInner {
            limit: limit as usize,
            life_time: Duration::from_secs(life_time as u64),
            drivers,
            idle: Mutex::new(VecDeque::new()),
            info,
        })))
    }

    /// The connection string this pool serves.
    pub fn connection_string(&self) -> &str {
        self.info().connection_string()
    }

    pub(crate) fn info(&self) -> &ConnectionInfo {
        &self.0.info
    }

    /// Lease a connection, reusing an idle one when possible.
    ///
    /// With `@pool_size=0` pooling is disabled: every call opens a fresh
    /// backend connection that will not return to the pool. A connection
    /// creation error propagates and leaves the pool unchanged.
    pub fn open(&self) -> Result<Connection> {
        if self.0.limit == 0 {
            let live = self.0.drivers.connect_live(&self.0.info)?;
            return Ok(Connection::new(live, None));
        }

        let live = match self.0.get() {
            Some(live) => live,
            None => self.0.drivers.connect_live(&self.0.info)?,
        };
        Ok(Connection::new(live, Some(Arc::clone(&self.0))))
    }

    /// Purge idle connections past their maximum idle time.
    pub fn gc(&self) {
        let garbage = {
            let mut idle = self.0.idle.lock();
            self.0.purge_stale(&mut idle, Instant::now())
        };
        drop(garbage);
    }

    /// Number of idle connections currently retained.
    pub fn idle_count(&self) -> usize {
        self.0.idle.lock().len()
    }

    // Outstanding handles to the shared pool state: this pool, its clones
    // and every leased connection.
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PoolInner {
    fn get(&self) -> Option<Live> {
        let (live, garbage) = {
            let mut idle = self.idle.lock();
            let garbage = self.purge_stale(&mut idle, Instant::now());
            (idle.pop_back().map(|entry| entry.live), garbage)
        };
        // backend teardown of purged entries happens outside the lock
        drop(garbage);

        if live.is_some() {
            tracing::debug!(target: "cppdb::pool", "reusing idle connection");
        }
        live
    }

    /// Return a leased connection to the idle list.
    pub(crate) fn put(&self, live: Live) {
        if self.limit == 0 {
            return;
        }
        let garbage = {
            let mut idle = self.idle.lock();
            // the timestamp is taken under the lock, which keeps the list
            // sorted by `last_used`
            let now = Instant::now();
            idle.push_back(Idle {
                live,
                last_used: now,
            });
            let mut garbage = self.purge_stale(&mut idle, now);
            // the list can be at most one entry over the limit here
            if idle.len() > self.limit {
                if let Some(oldest) = idle.pop_front() {
                    tracing::debug!(target: "cppdb::pool", "evicting oldest idle connection over pool size");
                    garbage.push(oldest);
                }
            }
            garbage
        };
        drop(garbage);
    }

    // The idle list is sorted by `last_used` (timestamps are assigned
    // under the same lock that inserts), so the scan from the stale end
    // stops at the first entry that is still fresh.
    fn purge_stale(&self, idle: &mut VecDeque<Idle>, now: Instant) -> Vec<Idle> {
        let mut garbage = Vec::new();
        while let Some(front) = idle.front() {
            if now.duration_since(front.last_used) > self.life_time {
                if let Some(entry) = idle.pop_front() {
                    garbage.push(entry);
                }
            } else {
                break;
            }
        }
        if !garbage.is_empty() {
            tracing::debug!(
                target: "cppdb::pool",
                count = garbage.len(),
                "evicting idle connections past max idle time"
            );
        }
        garbage
    }
}
