//! Shared connection lifecycle: one live handle per manager, lazily (re)opened.
//!
//! Steady-state reads take only a shared `RwLock` read. Opening and reopening
//! happen under an async mutex with a re-check, so a burst of callers that all
//! observe a stale handle produce exactly one open.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::DbConfig;
use crate::error::AppResult;

/// A live link to the backing store.
pub trait ConnectionHandle: Send + Sync + 'static {
    fn is_closed(&self) -> bool;
    /// Idempotent.
    fn close(&self);
}

/// Opens handles for a [`DbConfig`]. Each call is one blocking I/O round trip.
pub trait Connector: Send + Sync + 'static {
    type Handle: ConnectionHandle;
    fn open(&self, cfg: &DbConfig) -> impl Future<Output = AppResult<Self::Handle>> + Send;
}

pub struct ConnectionManager<C: Connector> {
    config: DbConfig,
    connector: C,
    handle: RwLock<Option<Arc<C::Handle>>>,
    reopen: tokio::sync::Mutex<()>,
    opens: AtomicU64,
}

impl<C: Connector> ConnectionManager<C> {
    /// Open the first handle eagerly. On failure nothing is kept.
    pub async fn connect(config: DbConfig, connector: C) -> AppResult<Self> {
        let mgr = Self {
            config,
            connector,
            handle: RwLock::new(None),
            reopen: tokio::sync::Mutex::new(()),
            opens: AtomicU64::new(0),
        };
        let first = Arc::new(mgr.open_logged().await?);
        *mgr.handle.write() = Some(first);
        Ok(mgr)
    }

    pub fn config(&self) -> &DbConfig { &self.config }

    /// Number of successful opens over this manager's lifetime.
    pub fn open_count(&self) -> u64 { self.opens.load(Ordering::SeqCst) }

    async fn open_logged(&self) -> AppResult<C::Handle> {
        match self.connector.open(&self.config).await {
            Ok(h) => {
                let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
                info!(target: "carehub::db", driver = %self.config.driver, opens = n, "database connection established");
                Ok(h)
            }
            Err(e) => {
                warn!(target: "carehub::db", driver = %self.config.driver, error = %e, "failed to establish database connection");
                Err(e)
            }
        }
    }

    fn live(&self) -> Option<Arc<C::Handle>> {
        self.handle.read().as_ref().filter(|h| !h.is_closed()).cloned()
    }

    /// A live handle, reopening once if the held one is missing or closed.
    pub async fn get_connection(&self) -> AppResult<Arc<C::Handle>> {
        if let Some(h) = self.live() {
            return Ok(h);
        }
        let _guard = self.reopen.lock().await;
        // Another caller may have reopened while we waited.
        if let Some(h) = self.live() {
            return Ok(h);
        }
        let fresh = Arc::new(self.open_logged().await?);
        let stale = self.handle.write().replace(fresh.clone());
        if let Some(old) = stale {
            old.close();
        }
        Ok(fresh)
    }

    /// Close the held handle, if any. Safe to repeat; a later
    /// [`get_connection`](Self::get_connection) opens a new one.
    pub async fn shutdown(&self) {
        let _guard = self.reopen.lock().await;
        let taken = self.handle.write().take();
        if let Some(h) = taken {
            h.close();
            info!(target: "carehub::db", "database connection closed");
        }
    }
}

/// Lazily built, shareable [`ConnectionManager`]: the `get_instance` entry point.
///
/// Concurrent first use yields one manager. A failed build installs nothing,
/// so the next call retries. Passed explicitly to collaborators; there is no
/// process-global instance.
pub struct ManagerCell<C: Connector + Clone> {
    config: DbConfig,
    connector: C,
    instance: RwLock<Option<Arc<ConnectionManager<C>>>>,
    init: tokio::sync::Mutex<()>,
}

impl<C: Connector + Clone> ManagerCell<C> {
    pub fn new(config: DbConfig, connector: C) -> Self {
        Self { config, connector, instance: RwLock::new(None), init: tokio::sync::Mutex::new(()) }
    }

    pub fn is_initialized(&self) -> bool { self.instance.read().is_some() }

    pub async fn get_instance(&self) -> AppResult<Arc<ConnectionManager<C>>> {
        let current = self.instance.read().clone();
        if let Some(m) = current {
            return Ok(m);
        }
        let _guard = self.init.lock().await;
        let current = self.instance.read().clone();
        if let Some(m) = current {
            return Ok(m);
        }
        let mgr = Arc::new(ConnectionManager::connect(self.config.clone(), self.connector.clone()).await?);
        *self.instance.write() = Some(mgr.clone());
        Ok(mgr)
    }

    /// Close the handle and forget the manager. No-op when never initialized.
    pub async fn shutdown(&self) {
        let _guard = self.init.lock().await;
        let taken = self.instance.write().take();
        if let Some(m) = taken {
            m.shutdown().await;
        }
    }
}
