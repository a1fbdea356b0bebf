use std::ops::{Deref, DerefMut};

use crate::connection::Connection;
use crate::error::Result;

/// Scope guard for a database transaction.
///
/// Begins a transaction on construction. Unless [`commit`](Self::commit)
/// is called, the guard rolls back on drop; errors from that implicit
/// rollback are swallowed, since teardown must not panic or propagate.
pub struct Transaction<'c> {
    conn: &'c mut Connection,
    committed: bool,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Result<Self> {
        conn.begin()?;
        Ok(Transaction {
            conn,
            committed: false,
        })
    }

    /// Commit and disarm the guard.
    pub fn commit(mut self) -> Result<()> {
        self.conn.commit()?;
        self.committed = true;
        Ok(())
    }

    /// Roll back explicitly, propagating any backend error.
    pub fn rollback(mut self) -> Result<()> {
        self.committed = true;
        self.conn.rollback()
    }
}

impl Deref for Transaction<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.rollback();
        }
    }
}
