//! Salted, slow one-way hashing of user secrets (Argon2id, PHC string format).
//!
//! Stored hashes embed their own parameters, so raising the work factor later
//! does not invalidate existing accounts.

use argon2::{Algorithm, Argon2, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use tracing::debug;

use crate::config::HashCost;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CredentialService {
    params: argon2::Params,
}

impl Default for CredentialService {
    fn default() -> Self { Self { params: argon2::Params::default() } }
}

fn fresh_salt() -> AppResult<SaltString> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::internal("rng_unavailable".to_string(), e.to_string()))?;
    SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::internal("salt_encoding".to_string(), e.to_string()))
}

impl CredentialService {
    pub fn new(cost: HashCost) -> AppResult<Self> {
        Ok(Self { params: cost.params()? })
    }

    pub fn cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.params.m_cost(),
            iterations: self.params.t_cost(),
            parallelism: self.params.p_cost(),
        }
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `secret` under a fresh random salt. Two calls never return the same string.
    pub fn hash(&self, secret: &str) -> AppResult<String> {
        if secret.is_empty() {
            return Err(AppError::user("empty_secret", "secret must not be empty"));
        }
        let salt = fresh_salt()?;
        let phc = self
            .hasher()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AppError::internal("hash_failed".to_string(), e.to_string()))?
            .to_string();
        debug!(target: "carehub::auth", m_cost = self.params.m_cost(), t_cost = self.params.t_cost(), "secret hashed");
        Ok(phc)
    }

    /// Check `secret` against a hash produced by [`CredentialService::hash`].
    ///
    /// An empty secret is simply `false`. A string that is not an Argon2 PHC hash
    /// is an `InvalidFormat` error rather than a mismatch.
    pub fn verify(&self, secret: &str, hashed: &str) -> AppResult<bool> {
        if secret.is_empty() {
            return Ok(false);
        }
        let parsed = PasswordHash::new(hashed)
            .map_err(|e| AppError::format("invalid_hash".to_string(), format!("unrecognized hash: {}", e)))?;
        if Algorithm::try_from(parsed.algorithm).is_err() {
            return Err(AppError::format("invalid_hash".to_string(), format!("unsupported algorithm '{}'", parsed.algorithm)));
        }
        if parsed.salt.is_none() || parsed.hash.is_none() {
            return Err(AppError::format("invalid_hash", "hash is missing its salt or digest"));
        }
        // Output equality inside password-hash is constant time.
        match self.hasher().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::format("invalid_hash".to_string(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> CredentialService { CredentialService::new(HashCost::minimal()).unwrap() }

    #[test]
    fn hash_then_verify() {
        let s = svc();
        let h = s.hash("Secret123").unwrap();
        assert!(h.starts_with("$argon2id$"));
        assert!(!h.contains("Secret123"));
        assert!(s.verify("Secret123", &h).unwrap());
        assert!(!s.verify("secret123", &h).unwrap());
    }

    #[test]
    fn same_secret_hashes_differently() {
        let s = svc();
        let a = s.hash("Secret123").unwrap();
        let b = s.hash("Secret123").unwrap();
        assert_ne!(a, b);
        assert!(s.verify("Secret123", &a).unwrap());
        assert!(s.verify("Secret123", &b).unwrap());
    }

    #[test]
    fn empty_secret_rejected_on_hash_false_on_verify() {
        let s = svc();
        assert_eq!(s.hash("").unwrap_err().code_str(), "empty_secret");
        let h = s.hash("x").unwrap();
        assert!(!s.verify("", &h).unwrap());
        assert!(!s.verify("", "not-a-hash").unwrap());
    }

    #[test]
    fn unrecognized_hashes_are_format_errors() {
        let s = svc();
        for bad in ["", "Secret123", "$2a$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW", "$argon2id$v=19$m=8,t=1,p=1"] {
            let err = s.verify("Secret123", bad).unwrap_err();
            assert!(matches!(err, AppError::InvalidFormat { .. }), "expected format error for {:?}, got {:?}", bad, err);
        }
    }

    #[test]
    fn verify_uses_parameters_embedded_in_hash() {
        let old = svc();
        let h = old.hash("Secret123").unwrap();
        let stronger = CredentialService::new(HashCost { memory_kib: 64, iterations: 2, parallelism: 1 }).unwrap();
        assert_eq!(stronger.cost().memory_kib, 64);
        assert!(stronger.verify("Secret123", &h).unwrap());
    }
}
