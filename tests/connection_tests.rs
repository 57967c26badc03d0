//! ConnectionManager lifecycle under concurrency, using an in-process fake
//! connector that counts open calls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use carehub::config::DbConfig;
use carehub::database::{ConnectionHandle, ConnectionManager, Connector, ManagerCell};
use carehub::{AppError, AppResult};

struct FakeHandle {
    serial: usize,
    closed: AtomicBool,
}

impl ConnectionHandle for FakeHandle {
    fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }
    fn close(&self) { self.closed.store(true, Ordering::SeqCst); }
}

#[derive(Clone, Default)]
struct FakeConnector {
    opens: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    delay_ms: u64,
}

impl FakeConnector {
    fn slow(delay_ms: u64) -> Self { Self { delay_ms, ..Default::default() } }
    fn opens(&self) -> usize { self.opens.load(Ordering::SeqCst) }
}

impl Connector for FakeConnector {
    type Handle = FakeHandle;

    async fn open(&self, _cfg: &DbConfig) -> AppResult<FakeHandle> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::connection("db_unreachable", "fake store is down"));
        }
        let serial = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeHandle { serial, closed: AtomicBool::new(false) })
    }
}

fn cfg() -> DbConfig { DbConfig::new("postgres", "postgres://fake/care") }

#[tokio::test]
async fn steady_state_reuses_one_handle() -> Result<()> {
    let conn = FakeConnector::default();
    let mgr = ConnectionManager::connect(cfg(), conn.clone()).await?;
    let a = mgr.get_connection().await?;
    let b = mgr.get_connection().await?;
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(conn.opens(), 1);
    assert_eq!(mgr.open_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stale_handle_reopened_exactly_once_under_contention() -> Result<()> {
    let conn = FakeConnector::slow(20);
    let mgr = Arc::new(ConnectionManager::connect(cfg(), conn.clone()).await?);
    let first = mgr.get_connection().await?;
    first.close();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.get_connection().await })
        })
        .collect();
    let handles = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.map_err(anyhow::Error::from).and_then(|h| h.map_err(anyhow::Error::from)))
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(conn.opens(), 2, "one initial open plus exactly one reopen");
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    assert_eq!(handles[0].serial, 2);
    assert!(!handles[0].is_closed());
    Ok(())
}

#[tokio::test]
async fn reopen_failure_surfaces_and_next_call_retries() -> Result<()> {
    let conn = FakeConnector::default();
    let mgr = ConnectionManager::connect(cfg(), conn.clone()).await?;
    mgr.get_connection().await?.close();

    conn.fail.store(true, Ordering::SeqCst);
    let err = mgr.get_connection().await.err().expect("reopen should fail");
    assert_eq!(err.code_str(), "db_unreachable");
    assert_eq!(err.http_status(), 503);

    conn.fail.store(false, Ordering::SeqCst);
    let h = mgr.get_connection().await?;
    assert_eq!(h.serial, 2);
    Ok(())
}

#[tokio::test]
async fn shutdown_is_idempotent_and_reconnects_on_demand() -> Result<()> {
    let conn = FakeConnector::default();
    let mgr = ConnectionManager::connect(cfg(), conn.clone()).await?;
    let before = mgr.get_connection().await?;
    mgr.shutdown().await;
    mgr.shutdown().await;
    assert!(before.is_closed());

    let after = mgr.get_connection().await?;
    assert!(!after.is_closed());
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(conn.opens(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_first_open_leaves_no_instance() -> Result<()> {
    let conn = FakeConnector::default();
    conn.fail.store(true, Ordering::SeqCst);
    let cell = ManagerCell::new(cfg(), conn.clone());

    assert!(cell.get_instance().await.is_err());
    assert!(!cell.is_initialized());

    conn.fail.store(false, Ordering::SeqCst);
    let mgr = cell.get_instance().await?;
    assert!(cell.is_initialized());
    assert_eq!(mgr.open_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_use_builds_one_manager() -> Result<()> {
    let conn = FakeConnector::slow(20);
    let cell = Arc::new(ManagerCell::new(cfg(), conn.clone()));
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cell = cell.clone();
            tokio::spawn(async move { cell.get_instance().await })
        })
        .collect();
    let mut managers = Vec::new();
    for r in futures::future::join_all(tasks).await {
        managers.push(r??);
    }
    assert!(managers.iter().all(|m| Arc::ptr_eq(m, &managers[0])));
    assert_eq!(conn.opens(), 1);
    Ok(())
}

#[tokio::test]
async fn cell_shutdown_then_get_instance_rebuilds() -> Result<()> {
    let conn = FakeConnector::default();
    let cell = ManagerCell::new(cfg(), conn.clone());
    cell.shutdown().await;

    let first = cell.get_instance().await?;
    let h1 = first.get_connection().await?;
    cell.shutdown().await;
    assert!(!cell.is_initialized());
    assert!(h1.is_closed());

    let second = cell.get_instance().await?;
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!second.get_connection().await?.is_closed());
    assert_eq!(conn.opens(), 2);
    Ok(())
}
