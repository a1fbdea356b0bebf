use std::sync::Arc;

use anyhow::Context;

use cppdb::mock::{MockCounters, MockDriver};
use cppdb::{Connection, ConnectionsManager, Driver};

fn mock_manager(names: &[&str]) -> (ConnectionsManager, Vec<Arc<MockCounters>>) {
    let manager = ConnectionsManager::new();
    manager.driver_manager().use_default_search_path(false);

    let mut counters = Vec::new();
    for name in names {
        let driver = MockDriver::new(name);
        counters.push(driver.counters());
        manager
            .driver_manager()
            .install_driver(name, Driver::new(Box::new(driver)));
    }
    (manager, counters)
}

fn connection_id(conn: &mut Connection) -> anyhow::Result<i64> {
    let mut st = conn.prepare("SELECT connection_id")?;
    let mut rows = st.query()?;
    anyhow::ensure!(rows.next()?);
    rows.fetch_i64(0)?.context("connection id was null")
}

#[test]
fn same_connection_string_shares_a_pool() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager(&["mock"]);

    let mut conn = manager.open("mock:db=a")?;
    let first = connection_id(&mut conn)?;
    drop(conn);

    let mut conn = manager.open("mock:db=a")?;
    assert_eq!(connection_id(&mut conn)?, first);
    assert_eq!(counters[0].connects(), 1);
    assert_eq!(manager.pool_count(), 1);

    Ok(())
}

#[test]
fn distinct_connection_strings_get_distinct_pools() -> anyhow::Result<()> {
    let (manager, _counters) = mock_manager(&["mock"]);

    drop(manager.open("mock:db=a")?);
    drop(manager.open("mock:db=b")?);

    assert_eq!(manager.pool_count(), 2);

    Ok(())
}

#[test]
fn unpooled_open_bypasses_the_pool_map() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager(&["mock"]);

    let mut a = manager.open("mock:@pool_size=0")?;
    let id_a = connection_id(&mut a)?;
    drop(a);

    let mut b = manager.open("mock:@pool_size=0")?;
    assert_ne!(connection_id(&mut b)?, id_a);
    assert_eq!(manager.pool_count(), 0);
    assert_eq!(counters[0].connects(), 2);

    Ok(())
}

#[test]
fn gc_drops_idle_pools_and_unused_drivers() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager(&["mock"]);

    drop(manager.open("mock:db=a")?);
    assert_eq!(manager.pool_count(), 1);
    assert_eq!(counters[0].live_connections(), 1);

    manager.gc();

    assert_eq!(manager.pool_count(), 0);
    assert_eq!(counters[0].live_connections(), 0);
    assert!(!manager.driver_manager().is_loaded("mock"));
    assert!(counters[0].dropped());

    Ok(())
}

#[test]
fn gc_keeps_pools_with_leased_connections() -> anyhow::Result<()> {
    let (manager, counters) = mock_manager(&["mock"]);

    let conn = manager.open("mock:db=a")?;
    manager.gc();

    assert_eq!(manager.pool_count(), 1);
    assert!(manager.driver_manager().is_loaded("mock"));
    assert!(!counters[0].dropped());

    drop(conn);
    Ok(())
}

#[test]
fn bad_connection_strings_fail_to_open() {
    let (manager, _counters) = mock_manager(&["mock"]);

    assert!(manager.open("nodriver").is_err());
    assert!(manager.open("mock:@pool_size=lots").is_err());
    assert!(manager.open("mock:k='unterminated").is_err());
}
