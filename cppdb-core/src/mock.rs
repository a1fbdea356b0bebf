//! An in-memory engine adapter for tests.
//!
//! The mock does not interpret SQL. It recognizes a handful of magic
//! queries so tests can observe pooling and caching through the public
//! API alone:
//!
//! - `SELECT connection_id` yields the serial number of the backend
//!   connection answering the query
//! - `SELECT statement_serial` yields the serial number minted when the
//!   statement was prepared
//! - `SELECT null` yields a single NULL
//! - `SELECT now` yields the fixed timestamp `2016-01-01 12:30:45`
//!
//! Any other query yields an empty result. Shared counters report how
//! many connections were opened and are still alive, how many statements
//! were prepared and how many transactions were started, committed and
//! rolled back.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend;
use crate::error::{Error, Result};
use crate::options::ConnectionInfo;

/// Shared observability for one [`MockDriver`] and its connections.
#[derive(Default)]
pub struct MockCounters {
    connects: AtomicUsize,
    live_connections: AtomicUsize,
    prepares: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    dropped: AtomicBool,
}

impl MockCounters {
    /// Total backend connections opened.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Backend connections currently alive, idle ones included.
    pub fn live_connections(&self) -> usize {
        self.live_connections.load(Ordering::SeqCst)
    }

    /// Total statements prepared, cache hits excluded.
    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Whether the driver itself has been dropped.
    pub fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// A backend driver serving in-memory connections.
pub struct MockDriver {
    name: String,
    counters: Arc<MockCounters>,
    fail_connect: bool,
    fail_rollback: bool,
}

impl MockDriver {
    pub fn new(name: &str) -> Self {
        MockDriver {
            name: name.to_owned(),
            counters: Arc::new(MockCounters::default()),
            fail_connect: false,
            fail_rollback: false,
        }
    }

    /// The counters this driver and its connections report into; survives
    /// the driver itself.
    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }

    /// Make every `open` fail.
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make every `rollback` fail.
    pub fn fail_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }
}

impl backend::Driver for MockDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, _info: &ConnectionInfo) -> Result<Box<dyn backend::Connection>> {
        if self.fail_connect {
            return Err(Error::Database("mock driver refused to connect".into()));
        }
        let id = self.counters.connects.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .live_connections
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            id,
            driver: self.name.clone(),
            counters: Arc::clone(&self.counters),
            fail_rollback: self.fail_rollback,
        }))
    }
}

impl Drop for MockDriver {
    fn drop(&mut self) {
        self.counters.dropped.store(true, Ordering::SeqCst);
    }
}

struct MockConnection {
    id: usize,
    driver: String,
    counters: Arc<MockCounters>,
    fail_rollback: bool,
}

impl backend::Connection for MockConnection {
    fn begin(&mut self) -> Result<()> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.fail_rollback {
            return Err(Error::Database("mock rollback failure".into()));
        }
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn real_prepare(&mut self, sql: &str) -> Result<Box<dyn backend::Statement>> {
        let serial = self.counters.prepares.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockStatement {
            sql: sql.to_owned(),
            serial,
            connection_id: self.id,
            placeholders: sql.bytes().filter(|&b| b == b'?').count(),
            bound: Vec::new(),
        }))
    }

    fn escape(&self, s: &str) -> Result<String> {
        Ok(s.replace('\'', "''"))
    }

    fn driver(&self) -> &str {
        &self.driver
    }

    fn engine(&self) -> &str {
        "mock"
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.counters
            .live_connections
            .fetch_sub(1, Ordering::SeqCst);
    }
}

struct MockStatement {
    sql: String,
    serial: usize,
    connection_id: usize,
    placeholders: usize,
    bound: Vec<usize>,
}

impl MockStatement {
    fn bind(&mut self, col: usize) -> Result<()> {
        if col == 0 || col > self.placeholders {
            return Err(Error::InvalidPlaceholder {
                index: col,
                len: self.placeholders,
            });
        }
        self.bound.push(col);
        Ok(())
    }
}

impl backend::Statement for MockStatement {
    fn reset(&mut self) -> Result<()> {
        self.bound.clear();
        Ok(())
    }

    fn sql_query(&self) -> &str {
        &self.sql
    }

    fn bind_i64(&mut self, col: usize, _value: i64) -> Result<()> {
        self.bind(col)
    }

    fn bind_u64(&mut self, col: usize, _value: u64) -> Result<()> {
        self.bind(col)
    }

    fn bind_f64(&mut self, col: usize, _value: f64) -> Result<()> {
        self.bind(col)
    }

    fn bind_str(&mut self, col: usize, _value: &str) -> Result<()> {
        self.bind(col)
    }

    fn bind_bytes(&mut self, col: usize, _value: &[u8]) -> Result<()> {
        self.bind(col)
    }

    fn bind_tm(&mut self, col: usize, value: &str) -> Result<()> {
        if !is_tm(value) {
            return Err(Error::ValueConversion);
        }
        self.bind(col)
    }

    fn bind_null(&mut self, col: usize) -> Result<()> {
        self.bind(col)
    }

    fn sequence_last(&mut self, _sequence: &str) -> Result<i64> {
        Err(Error::NotSupported("sequence_last"))
    }

    fn affected(&mut self) -> Result<u64> {
        Ok(1)
    }

    fn query(&mut self) -> Result<Box<dyn backend::Rows + '_>> {
        let rows = match self.sql.as_str() {
            "SELECT connection_id" => vec![vec![Some(self.connection_id.to_string())]],
            "SELECT statement_serial" => vec![vec![Some(self.serial.to_string())]],
            "SELECT null" => vec![vec![None]],
            "SELECT engine" => vec![vec![Some("mock".to_owned())]],
            "SELECT now" => vec![vec![Some("2016-01-01 12:30:45".to_owned())]],
            _ => Vec::new(),
        };
        Ok(Box::new(MockRows { rows, current: None }))
    }

    fn exec(&mut self) -> Result<()> {
        Ok(())
    }
}

// `YYYY-MM-DD HH:MM:SS`
fn is_tm(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, &c)| match i {
            4 | 7 => c == b'-',
            10 => c == b' ',
            13 | 16 => c == b':',
            _ => c.is_ascii_digit(),
        })
}

/// All mock results are a single textual column named `value`.
struct MockRows {
    rows: Vec<Vec<Option<String>>>,
    current: Option<usize>,
}

impl MockRows {
    fn cell(&self, col: usize) -> Result<Option<&str>> {
        let row = self
            .current
            .and_then(|at| self.rows.get(at))
            .ok_or(Error::EmptyRow)?;
        let cell = row.get(col).ok_or(Error::ColumnIndexOutOfBounds {
            index: col,
            len: row.len(),
        })?;
        Ok(cell.as_deref())
    }

    fn parse<T: std::str::FromStr>(&self, col: usize) -> Result<Option<T>> {
        match self.cell(col)? {
            None => Ok(None),
            Some(text) => text
                .parse()
                .map(Some)
                .map_err(|_| Error::ValueConversion),
        }
    }
}

impl backend::Rows for MockRows {
    fn next(&mut self) -> Result<bool> {
        let at = self.current.map_or(0, |at| at + 1);
        if at < self.rows.len() {
            self.current = Some(at);
            Ok(true)
        } else {
            self.current = Some(self.rows.len());
            Ok(false)
        }
    }

    fn cols(&self) -> usize {
        1
    }

    fn is_null(&self, col: usize) -> Result<bool> {
        Ok(self.cell(col)?.is_none())
    }

    fn fetch_i64(&self, col: usize) -> Result<Option<i64>> {
        self.parse(col)
    }

    fn fetch_u64(&self, col: usize) -> Result<Option<u64>> {
        self.parse(col)
    }

    fn fetch_f64(&self, col: usize) -> Result<Option<f64>> {
        self.parse(col)
    }

    fn fetch_string(&self, col: usize) -> Result<Option<String>> {
        Ok(self.cell(col)?.map(str::to_owned))
    }

    fn fetch_bytes(&self, col: usize) -> Result<Option<Vec<u8>>> {
        Ok(self.cell(col)?.map(|text| text.as_bytes().to_vec()))
    }

    fn fetch_tm(&self, col: usize) -> Result<Option<String>> {
        match self.cell(col)? {
            None => Ok(None),
            Some(text) if is_tm(text) => Ok(Some(text.to_owned())),
            Some(_) => Err(Error::ValueConversion),
        }
    }

    fn name_to_column(&self, name: &str) -> Result<usize> {
        if name == "value" {
            Ok(0)
        } else {
            Err(Error::ColumnNotFound(name.to_owned()))
        }
    }

    fn column_to_name(&self, col: usize) -> Result<String> {
        if col == 0 {
            Ok("value".to_owned())
        } else {
            Err(Error::ColumnIndexOutOfBounds { index: col, len: 1 })
        }
    }
}
