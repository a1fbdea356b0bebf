use std::sync::Arc;

use cppdb::mock::{MockCounters, MockDriver};
use cppdb::{Connection, Driver, DriverManager, Error};

fn mock_connection() -> anyhow::Result<(Connection, Arc<MockCounters>)> {
    let driver = MockDriver::new("mock");
    let counters = driver.counters();
    let manager = DriverManager::new();
    manager.install_driver("mock", Driver::new(Box::new(driver)));
    Ok((manager.connect(&"mock:".parse()?)?, counters))
}

#[test]
fn dropped_guard_rolls_back() -> anyhow::Result<()> {
    let (mut conn, counters) = mock_connection()?;

    {
        let _tx = conn.transaction()?;
    }

    assert_eq!(counters.begins(), 1);
    assert_eq!(counters.rollbacks(), 1);
    assert_eq!(counters.commits(), 0);

    Ok(())
}

#[test]
fn commit_disarms_the_guard() -> anyhow::Result<()> {
    let (mut conn, counters) = mock_connection()?;

    let mut tx = conn.transaction()?;
    let mut st = tx.prepare("UPDATE t SET x = 1")?;
    st.exec()?;
    drop(st);
    tx.commit()?;

    assert_eq!(counters.commits(), 1);
    assert_eq!(counters.rollbacks(), 0);

    Ok(())
}

#[test]
fn explicit_rollback_propagates_errors() -> anyhow::Result<()> {
    let driver = MockDriver::new("mock").fail_rollback();
    let manager = DriverManager::new();
    manager.install_driver("mock", Driver::new(Box::new(driver)));
    let mut conn = manager.connect(&"mock:".parse()?)?;

    let tx = conn.transaction()?;
    assert!(matches!(tx.rollback(), Err(Error::Database(_))));

    Ok(())
}

#[test]
fn implicit_rollback_swallows_errors() -> anyhow::Result<()> {
    let driver = MockDriver::new("mock").fail_rollback();
    let manager = DriverManager::new();
    manager.install_driver("mock", Driver::new(Box::new(driver)));
    let mut conn = manager.connect(&"mock:".parse()?)?;

    // dropping the guard must not panic even when the backend rollback
    // fails
    {
        let _tx = conn.transaction()?;
    }

    Ok(())
}

#[test]
fn empty_handle_rejects_every_operation() {
    let mut conn = Connection::default();

    assert!(!conn.is_open());
    assert!(matches!(conn.begin(), Err(Error::EmptyHandle)));
    assert!(matches!(conn.commit(), Err(Error::EmptyHandle)));
    assert!(matches!(conn.rollback(), Err(Error::EmptyHandle)));
    assert!(matches!(conn.prepare("SELECT 1"), Err(Error::EmptyHandle)));
    assert!(matches!(conn.escape("x"), Err(Error::EmptyHandle)));
    assert!(matches!(conn.driver(), Err(Error::EmptyHandle)));
    assert!(matches!(conn.engine(), Err(Error::EmptyHandle)));
}

#[test]
fn driver_and_engine_names_come_from_the_backend() -> anyhow::Result<()> {
    let (conn, _counters) = mock_connection()?;

    assert_eq!(conn.driver()?, "mock");
    assert_eq!(conn.engine()?, "mock");
    assert_eq!(conn.escape("o'clock")?, "o''clock");

    Ok(())
}
