use crate::backend;
use crate::cache::StatementCache;
use crate::error::Result;

const RELEASED: &str = "(bug) statement already returned to its cache";

/// A prepared statement leased from a [`Connection`](crate::Connection).
///
/// Statement lifetime is bimodal: one created through an active statement
/// cache is only lent out and returns to that cache on drop (after a
/// reset); an uncached statement is owned outright and closed on drop.
pub struct Statement<'c> {
    raw: Option<Box<dyn backend::Statement>>,
    cache: Option<&'c mut StatementCache>,
}

impl<'c> Statement<'c> {
    pub(crate) fn new(
        raw: Box<dyn backend::Statement>,
        cache: Option<&'c mut StatementCache>,
    ) -> Self {
        Statement {
            raw: Some(raw),
            cache,
        }
    }

    fn raw_mut(&mut self) -> &mut dyn backend::Statement {
        self.raw.as_mut().expect(RELEASED).as_mut()
    }

    fn raw_ref(&self) -> &dyn backend::Statement {
        self.raw.as_ref().expect(RELEASED).as_ref()
    }

    /// The SQL text this statement was prepared from.
    pub fn sql_query(&self) -> &str {
        self.raw_ref().sql_query()
    }

    /// Reset binds and execution state.
    pub fn reset(&mut self) -> Result<()> {
        self.raw_mut().reset()
    }

    /// Bind a value to the 1-based placeholder `col`.
    pub fn bind_i64(&mut self, col: usize, value: i64) -> Result<()> {
        self.raw_mut().bind_i64(col, value)
    }

    pub fn bind_u64(&mut self, col: usize, value: u64) -> Result<()> {
        self.raw_mut().bind_u64(col, value)
    }

    pub fn bind_f64(&mut self, col: usize, value: f64) -> Result<()> {
        self.raw_mut().bind_f64(col, value)
    }

    pub fn bind_str(&mut self, col: usize, value: &str) -> Result<()> {
        self.raw_mut().bind_str(col, value)
    }

    pub fn bind_bytes(&mut self, col: usize, value: &[u8]) -> Result<()> {
        self.raw_mut().bind_bytes(col, value)
    }

    /// Bind a `YYYY-MM-DD HH:MM:SS` timestamp.
    pub fn bind_tm(&mut self, col: usize, value: &str) -> Result<()> {
        self.raw_mut().bind_tm(col, value)
    }

    pub fn bind_null(&mut self, col: usize) -> Result<()> {
        self.raw_mut().bind_null(col)
    }

    /// The last sequence value generated for an inserted row.
    pub fn sequence_last(&mut self, sequence: &str) -> Result<i64> {
        self.raw_mut().sequence_last(sequence)
    }

    /// Rows affected by the last [`exec`](Self::exec).
    pub fn affected(&mut self) -> Result<u64> {
        self.raw_mut().affected()
    }

    /// Execute a query and return its result rows.
    pub fn query(&mut self) -> Result<Box<dyn backend::Rows + '_>> {
        self.raw.as_mut().expect(RELEASED).query()
    }

    /// Execute a statement that returns no rows.
    pub fn exec(&mut self) -> Result<()> {
        self.raw_mut().exec()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Some(cache) = self.cache.take() {
                cache.put(raw);
            }
        }
    }
}
