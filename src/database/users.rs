use std::sync::Arc;

use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::warn;

use super::connection::ConnectionManager;
use super::postgres::PgConnector;
use crate::error::{AppError, AppResult};
use crate::identity::{Identity, NewIdentity, Role, UserDirectory};

pub const USERS_DDL: &str = "CREATE TABLE IF NOT EXISTS users (\
    id BIGSERIAL PRIMARY KEY, \
    username VARCHAR(20) NOT NULL UNIQUE, \
    password_hash TEXT NOT NULL, \
    role VARCHAR(16) NOT NULL, \
    email VARCHAR(255) NOT NULL, \
    phone VARCHAR(20))";

const SELECT_USER: &str = "SELECT id::int8 AS id, username, password_hash, role, email, phone FROM users";

/// [`UserDirectory`] over the `users` table. Role profiles live in other
/// tables and are not loaded here.
#[derive(Clone)]
pub struct PgUserDirectory {
    mgr: Arc<ConnectionManager<PgConnector>>,
}

fn row_to_identity(row: &Row) -> AppResult<Identity> {
    let role_s: String = row.try_get("role")?;
    let id: i64 = row.try_get("id")?;
    let Some(role) = Role::parse(role_s.trim()) else {
        warn!(target: "carehub::db", user_id = id, role = %role_s, "stored account has unknown role");
        return Err(AppError::internal("unknown_role".to_string(), format!("account {} has unknown role", id)));
    };
    Ok(Identity {
        id,
        username: row.try_get("username")?,
        secret_hash: row.try_get("password_hash")?,
        role,
        email: row.try_get::<_, Option<String>>("email")?.unwrap_or_default(),
        phone: row.try_get("phone")?,
        profile: None,
    })
}

impl PgUserDirectory {
    pub fn new(mgr: Arc<ConnectionManager<PgConnector>>) -> Self { Self { mgr } }

    pub async fn ensure_schema(&self) -> AppResult<()> {
        let conn = self.mgr.get_connection().await?;
        conn.client().batch_execute(USERS_DDL).await?;
        Ok(())
    }

    async fn query_one_user(&self, sql: &str, params: &[&(dyn tokio_postgres::types::ToSql + Sync)]) -> AppResult<Option<Identity>> {
        let conn = self.mgr.get_connection().await?;
        let row = conn.client().query_opt(sql, params).await?;
        row.as_ref().map(row_to_identity).transpose()
    }
}

impl UserDirectory for PgUserDirectory {
    async fn lookup_by_username(&self, username: &str) -> AppResult<Option<Identity>> {
        let sql = format!("{} WHERE username = $1", SELECT_USER);
        self.query_one_user(&sql, &[&username]).await
    }

    async fn lookup_by_id(&self, id: i64) -> AppResult<Option<Identity>> {
        let sql = format!("{} WHERE id = $1", SELECT_USER);
        self.query_one_user(&sql, &[&id]).await
    }

    async fn insert(&self, new: NewIdentity) -> AppResult<Identity> {
        let conn = self.mgr.get_connection().await?;
        let res = conn
            .client()
            .query_one(
                "INSERT INTO users (username, password_hash, role, email, phone) VALUES ($1, $2, $3, $4, $5) RETURNING id::int8",
                &[&new.username, &new.secret_hash, &new.role.as_str(), &new.email, &new.phone],
            )
            .await;
        let row = match res {
            Ok(row) => row,
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                return Err(AppError::conflict("username_taken".to_string(), format!("username '{}' already exists", new.username)));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Identity {
            id: row.try_get(0)?,
            username: new.username,
            secret_hash: new.secret_hash,
            role: new.role,
            email: new.email,
            phone: new.phone,
            profile: None,
        })
    }
}
