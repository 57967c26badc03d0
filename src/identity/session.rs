use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use super::principal::SessionPrincipal;
use crate::config::DEFAULT_SESSION_TTL_SECS;
use crate::error::{AppError, AppResult};
use crate::tprintln;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub principal: SessionPrincipal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

fn gen_token() -> AppResult<SessionToken> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AppError::internal("rng_unavailable".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Token → principal map for front ends that keep server-side sessions.
pub struct SessionStore {
    pub ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    by_user: RwLock<HashMap<i64, HashSet<SessionToken>>>,
}

impl Default for SessionStore {
    fn default() -> Self { Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECS)) }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: RwLock::new(HashMap::new()), by_user: RwLock::new(HashMap::new()) }
    }

    pub fn issue(&self, principal: SessionPrincipal) -> AppResult<Session> {
        let now = Instant::now();
        let token = gen_token()?;
        let sess = Session { token: token.clone(), principal, issued_at: now, expires_at: now + self.ttl };
        self.sessions.write().insert(token.clone(), sess.clone());
        self.by_user.write().entry(principal.id).or_default().insert(token);
        debug!(target: "carehub::session", user_id = principal.id, ttl_secs = self.ttl.as_secs(), "session issued");
        Ok(sess)
    }

    /// Live principal for `token`; expired sessions are dropped on sight.
    pub fn validate(&self, token: &str) -> Option<SessionPrincipal> {
        let now = Instant::now();
        let expired = {
            let map = self.sessions.read();
            match map.get(token) {
                Some(s) if s.expires_at > now => return Some(s.principal),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.remove(token);
        }
        None
    }

    fn remove(&self, token: &str) -> Option<Session> {
        let sess = self.sessions.write().remove(token)?;
        let mut idx = self.by_user.write();
        if let Some(set) = idx.get_mut(&sess.principal.id) {
            set.remove(token);
            if set.is_empty() { idx.remove(&sess.principal.id); }
        }
        Some(sess)
    }

    pub fn logout(&self, token: &str) -> bool {
        let removed = self.remove(token);
        if let Some(s) = &removed {
            debug!(target: "carehub::session", user_id = s.principal.id, "session closed");
        }
        removed.is_some()
    }

    /// Drop every session of one account, e.g. after a password change.
    pub fn revoke_user(&self, user_id: i64) -> usize {
        let tokens = self.by_user.write().remove(&user_id).unwrap_or_default();
        let mut s = self.sessions.write();
        let count = tokens.iter().filter(|t| s.remove(t.as_str()).is_some()).count();
        tprintln!("session.revoke user={} count={}", user_id, count);
        count
    }

    pub fn active(&self) -> usize { self.sessions.read().len() }
}
