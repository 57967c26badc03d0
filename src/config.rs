//! Process configuration for the connection manager and credential hashing.
//! Sources: environment variables, or a `key=value` properties file using the
//! `db.driver` / `db.url` / `db.username` / `db.password` keys.

use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_DRIVER: &str = "postgres";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub driver: String,
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl DbConfig {
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self { driver: driver.into(), url: url.into(), user: None, password: None }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    fn build(driver: Option<String>, url: Option<String>, user: Option<String>, password: Option<String>) -> AppResult<Self> {
        let Some(url) = non_empty(url) else {
            return Err(AppError::user("missing_db_url", "database url is not configured"));
        };
        Ok(Self {
            driver: non_empty(driver).unwrap_or_else(|| DEFAULT_DRIVER.to_string()),
            url,
            user: non_empty(user),
            // passwords are taken verbatim, whitespace included
            password: password.filter(|p| !p.is_empty()),
        })
    }

    /// Read `CAREHUB_DB_DRIVER`, `CAREHUB_DB_URL`, `CAREHUB_DB_USER`, `CAREHUB_DB_PASSWORD`.
    pub fn from_env() -> AppResult<Self> {
        Self::build(
            env::var("CAREHUB_DB_DRIVER").ok(),
            env::var("CAREHUB_DB_URL").ok(),
            env::var("CAREHUB_DB_USER").ok(),
            env::var("CAREHUB_DB_PASSWORD").ok(),
        )
    }

    pub fn from_properties(text: &str) -> AppResult<Self> {
        let (mut driver, mut url, mut user, mut password) = (None, None, None, None);
        for line in text.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') { continue; }
            let Some((k, v)) = line.split_once(['=', ':']) else { continue; };
            let v = v.trim_start().trim_end_matches(['\r', '\n']).to_string();
            match k.trim() {
                "db.driver" => driver = Some(v),
                "db.url" => url = Some(v),
                "db.username" => user = Some(v),
                "db.password" => password = Some(v),
                _ => {}
            }
        }
        Self::build(driver, url, user, password)
    }

    pub fn from_properties_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::user("config_unreadable".to_string(), format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_properties(&text)
    }
}

/// Work factor for the Argon2id credential hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

fn parse_u32_env(name: &str) -> AppResult<Option<u32>> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::user("invalid_config".to_string(), format!("{} must be a positive integer", name))),
        Err(_) => Ok(None),
    }
}

impl HashCost {
    /// Cheapest parameters Argon2 accepts. Tests only.
    pub fn minimal() -> Self {
        Self { memory_kib: argon2::Params::MIN_M_COST.max(8), iterations: 1, parallelism: 1 }
    }

    pub fn from_env() -> AppResult<Self> {
        let d = Self::default();
        Ok(Self {
            memory_kib: parse_u32_env("CAREHUB_HASH_MEMORY_KIB")?.unwrap_or(d.memory_kib),
            iterations: parse_u32_env("CAREHUB_HASH_ITERATIONS")?.unwrap_or(d.iterations),
            parallelism: parse_u32_env("CAREHUB_HASH_PARALLELISM")?.unwrap_or(d.parallelism),
        })
    }

    pub(crate) fn params(&self) -> AppResult<argon2::Params> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AppError::user("invalid_hash_cost".to_string(), e.to_string()))
    }
}

pub fn session_ttl_from_env() -> AppResult<Duration> {
    match env::var("CAREHUB_SESSION_TTL_SECS") {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::user("invalid_config", "CAREHUB_SESSION_TTL_SECS must be a number of seconds")),
        Err(_) => Ok(Duration::from_secs(DEFAULT_SESSION_TTL_SECS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn properties_parse_original_keys() {
        let text = "# comment\n! also comment\n\ndb.driver=postgresql\ndb.url = host=localhost dbname=care\ndb.username=care\ndb.password=s3cret pass\nother=ignored\n";
        let cfg = DbConfig::from_properties(text).unwrap();
        assert_eq!(cfg.driver, "postgresql");
        assert_eq!(cfg.url, "host=localhost dbname=care");
        assert_eq!(cfg.user.as_deref(), Some("care"));
        assert_eq!(cfg.password.as_deref(), Some("s3cret pass"));
    }

    #[test]
    fn properties_default_driver_and_missing_url() {
        let cfg = DbConfig::from_properties("db.url=postgres://localhost/care").unwrap();
        assert_eq!(cfg.driver, DEFAULT_DRIVER);
        assert!(cfg.user.is_none());

        let err = DbConfig::from_properties("db.username=x").unwrap_err();
        assert_eq!(err.code_str(), "missing_db_url");
    }

    #[test]
    fn properties_file_roundtrip_via_tempfile() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "db.url=postgres://db/care").unwrap();
        writeln!(f, "db.password=pw").unwrap();
        let cfg = DbConfig::from_properties_file(f.path()).unwrap();
        assert_eq!(cfg.url, "postgres://db/care");

        let missing = DbConfig::from_properties_file(Path::new("/nonexistent/carehub.properties")).unwrap_err();
        assert_eq!(missing.code_str(), "config_unreadable");
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = DbConfig::new("postgres", "postgres://localhost/care").with_credentials("care", "hunter22");
        let s = format!("{:?}", cfg);
        assert!(!s.contains("hunter22"));
        assert!(s.contains("<redacted>"));
    }

    #[test]
    fn hash_cost_params_validate() {
        assert!(HashCost::default().params().is_ok());
        assert!(HashCost::minimal().params().is_ok());
        let bad = HashCost { memory_kib: 1, iterations: 0, parallelism: 0 };
        assert_eq!(bad.params().unwrap_err().code_str(), "invalid_hash_cost");
    }
}
