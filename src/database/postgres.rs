use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};
use tracing::debug;

use super::connection::{ConnectionHandle, Connector};
use crate::config::DbConfig;
use crate::error::{AppError, AppResult};

const SUPPORTED_DRIVERS: &[&str] = &["postgres", "postgresql"];

/// Opens tokio-postgres clients. The `url` may be a `postgres://` URL or a
/// `key=value` connection string; `user`/`password` from the config override it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

pub struct PgHandle {
    client: Client,
    driver: JoinHandle<()>,
    closed: AtomicBool,
}

impl PgHandle {
    pub fn client(&self) -> &Client { &self.client }
}

impl ConnectionHandle for PgHandle {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.client.is_closed() || self.driver.is_finished()
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.driver.abort();
        }
    }
}

impl Drop for PgHandle {
    fn drop(&mut self) { self.driver.abort(); }
}

pub(crate) fn pg_config(cfg: &DbConfig) -> AppResult<Config> {
    if !SUPPORTED_DRIVERS.iter().any(|d| d.eq_ignore_ascii_case(cfg.driver.trim())) {
        return Err(AppError::connection("unsupported_driver".to_string(), format!("driver '{}' is not supported", cfg.driver)));
    }
    let mut pg: Config = cfg
        .url
        .parse()
        .map_err(|e: tokio_postgres::Error| AppError::connection("invalid_db_url".to_string(), e.to_string()))?;
    if let Some(u) = &cfg.user { pg.user(u); }
    if let Some(p) = &cfg.password { pg.password(p); }
    Ok(pg)
}

impl Connector for PgConnector {
    type Handle = PgHandle;

    async fn open(&self, cfg: &DbConfig) -> AppResult<PgHandle> {
        let pg = pg_config(cfg)?;
        let (client, conn) = pg
            .connect(NoTls)
            .await
            .map_err(|e| AppError::connection("db_unreachable".to_string(), e.to_string()))?;
        // drive the connection in background
        let driver = tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(target: "carehub::db", error = %e, "connection task ended");
            }
        });
        Ok(PgHandle { client, driver, closed: AtomicBool::new(false) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_driver() {
        let cfg = DbConfig::new("com.mysql.cj.jdbc.Driver", "postgres://localhost/care");
        assert_eq!(pg_config(&cfg).unwrap_err().code_str(), "unsupported_driver");
    }

    #[test]
    fn accepts_url_and_overrides_credentials() {
        let cfg = DbConfig::new("PostgreSQL", "postgres://someone@db.internal:5433/care").with_credentials("care", "pw");
        let pg = pg_config(&cfg).unwrap();
        assert_eq!(pg.get_user(), Some("care"));
        assert_eq!(pg.get_password(), Some(&b"pw"[..]));
        assert_eq!(pg.get_dbname(), Some("care"));
    }

    #[test]
    fn malformed_url_is_connection_error() {
        let cfg = DbConfig::new("postgres", "host=localhost port=notaport");
        let err = pg_config(&cfg).unwrap_err();
        assert_eq!(err.code_str(), "invalid_db_url");
        assert_eq!(err.http_status(), 503);
    }

    #[tokio::test]
    async fn unreachable_server_fails_open() {
        // port 1 on loopback refuses immediately
        let cfg = DbConfig::new("postgres", "host=127.0.0.1 port=1 user=care dbname=care connect_timeout=2");
        let err = PgConnector.open(&cfg).await.err().expect("open should fail");
        assert_eq!(err.code_str(), "db_unreachable");
    }
}
