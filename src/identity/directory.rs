use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use super::principal::{Identity, Role, RoleProfile};
use crate::error::{AppError, AppResult};

/// Account data ready to be stored; `secret_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub secret_hash: String,
    pub role: Role,
    pub email: String,
    pub phone: Option<String>,
    pub profile: Option<RoleProfile>,
}

/// User lookup backed by some store. Storage failures surface as
/// `AppError::Connection` and are passed through by callers unchanged.
pub trait UserDirectory: Send + Sync {
    fn lookup_by_username(&self, username: &str) -> impl Future<Output = AppResult<Option<Identity>>> + Send;
    fn lookup_by_id(&self, id: i64) -> impl Future<Output = AppResult<Option<Identity>>> + Send;
    /// Store a new account and return it with its assigned id.
    /// A taken username is `AppError::Conflict`.
    fn insert(&self, new: NewIdentity) -> impl Future<Output = AppResult<Identity>> + Send;
}

/// Process-local directory, used by tests and embedded setups.
#[derive(Debug)]
pub struct InMemoryUserDirectory {
    by_name: RwLock<HashMap<String, Identity>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self { Self { by_name: RwLock::new(HashMap::new()), next_id: AtomicI64::new(1) } }
}

impl InMemoryUserDirectory {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.by_name.read().len() }

    pub fn is_empty(&self) -> bool { self.by_name.read().is_empty() }

    fn insert_now(&self, new: NewIdentity) -> AppResult<Identity> {
        let mut map = self.by_name.write();
        if map.contains_key(&new.username) {
            return Err(AppError::conflict("username_taken".to_string(), format!("username '{}' already exists", new.username)));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let identity = Identity {
            id,
            username: new.username,
            secret_hash: new.secret_hash,
            role: new.role,
            email: new.email,
            phone: new.phone,
            profile: None,
        };
        let identity = match new.profile {
            Some(p) => identity.with_profile(p),
            None => identity,
        };
        map.insert(identity.username.clone(), identity.clone());
        Ok(identity)
    }
}

impl UserDirectory for InMemoryUserDirectory {
    async fn lookup_by_username(&self, username: &str) -> AppResult<Option<Identity>> {
        Ok(self.by_name.read().get(username).cloned())
    }

    async fn lookup_by_id(&self, id: i64) -> AppResult<Option<Identity>> {
        Ok(self.by_name.read().values().find(|i| i.id == id).cloned())
    }

    async fn insert(&self, new: NewIdentity) -> AppResult<Identity> {
        self.insert_now(new)
    }
}
