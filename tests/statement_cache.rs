use anyhow::Context;

use cppdb::mock::{MockCounters, MockDriver};
use cppdb::{Connection, ConnectionsManager, Driver};
use std::sync::Arc;

fn mock_manager() -> (ConnectionsManager, Arc<MockCounters>) {
    let driver = MockDriver::new("mock");
    let counters = driver.counters();
    let manager = ConnectionsManager::new();
    manager
        .driver_manager()
        .install_driver("mock", Driver::new(Box::new(driver)));
    (manager, counters)
}

fn statement_serial(conn: &mut Connection) -> anyhow::Result<i64> {
    let mut st = conn.prepare("SELECT statement_serial")?;
    let mut rows = st.query()?;
    anyhow::ensure!(rows.next()?);
    rows.fetch_i64(0)?.context("statement serial was null")
}

#[test]
fn repeated_prepare_reuses_the_cached_statement() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager();
    let mut conn = manager.open("mock:@pool_size=0;@stmt_cache_size=8")?;

    let first = statement_serial(&mut conn)?;
    let second = statement_serial(&mut conn)?;

    assert_eq!(first, second);
    assert_eq!(counters.prepares(), 1);

    Ok(())
}

#[test]
fn caching_is_on_by_default() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager();
    let mut conn = manager.open("mock:@pool_size=0")?;

    statement_serial(&mut conn)?;
    statement_serial(&mut conn)?;
    assert_eq!(counters.prepares(), 1);

    Ok(())
}

#[test]
fn distinct_sql_texts_do_not_share_statements() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager();
    let mut conn = manager.open("mock:@pool_size=0;@stmt_cache_size=8")?;

    drop(conn.prepare("SELECT a")?);
    drop(conn.prepare("SELECT a ")?);

    // keyed by exact text, trailing whitespace included
    assert_eq!(counters.prepares(), 2);

    Ok(())
}

#[test]
fn zero_cache_size_disables_caching() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager();
    let mut conn = manager.open("mock:@pool_size=0;@stmt_cache_size=0")?;

    let first = statement_serial(&mut conn)?;
    let second = statement_serial(&mut conn)?;

    assert_ne!(first, second);
    assert_eq!(counters.prepares(), 2);

    Ok(())
}

#[test]
fn least_recently_used_statement_is_evicted() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager();
    let mut conn = manager.open("mock:@pool_size=0;@stmt_cache_size=1")?;

    drop(conn.prepare("SELECT a")?);
    drop(conn.prepare("SELECT b")?);
    drop(conn.prepare("SELECT a")?);

    assert_eq!(counters.prepares(), 3);

    Ok(())
}

#[test]
fn cache_travels_with_the_pooled_connection() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager();

    let mut conn = manager.open("mock:@pool_size=4;@stmt_cache_size=8")?;
    let first = statement_serial(&mut conn)?;
    drop(conn);

    // the reused connection still holds its prepared statement
    let mut conn = manager.open("mock:@pool_size=4;@stmt_cache_size=8")?;
    assert_eq!(statement_serial(&mut conn)?, first);
    assert_eq!(counters.prepares(), 1);
    assert_eq!(counters.connects(), 1);

    Ok(())
}
