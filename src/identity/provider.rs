use base64::Engine;
use tracing::{info, warn};

use super::directory::{NewIdentity, UserDirectory};
use super::principal::{Identity, Role, RoleProfile, SessionPrincipal};
use crate::credentials::CredentialService;
use crate::error::{AppError, AppResult};
use crate::validation;

/// Registration form as a front end collects it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub secret: String,
    pub role: Role,
    pub email: String,
    pub phone: Option<String>,
    pub profile: Option<RoleProfile>,
}

/// Login orchestration over a [`CredentialService`] and a [`UserDirectory`].
///
/// Holds no per-login state. Session establishment (cookies, tokens) is left to
/// the caller, see [`super::SessionStore`].
pub struct AuthSession {
    creds: CredentialService,
    // Verified against when the username is unknown so both failure paths cost one hash.
    decoy_hash: String,
}

fn random_secret() -> AppResult<String> {
    let mut buf = [0u8; 24];
    getrandom::getrandom(&mut buf).map_err(|e| AppError::internal("rng_unavailable".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

impl AuthSession {
    pub fn new(creds: CredentialService) -> AppResult<Self> {
        let decoy_hash = creds.hash(&random_secret()?)?;
        Ok(Self { creds, decoy_hash })
    }

    pub fn credentials(&self) -> &CredentialService { &self.creds }

    async fn verify_blocking(&self, secret: &str, hash: &str) -> AppResult<bool> {
        let creds = self.creds.clone();
        let (secret, hash) = (secret.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || creds.verify(&secret, &hash))
            .await
            .map_err(|e| AppError::internal("verify_task".to_string(), e.to_string()))?
    }

    async fn hash_blocking(&self, secret: &str) -> AppResult<String> {
        let creds = self.creds.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || creds.hash(&secret))
            .await
            .map_err(|e| AppError::internal("hash_task".to_string(), e.to_string()))?
    }

    /// Authenticate `username`/`secret`.
    ///
    /// Unknown user, wrong secret and an unreadable stored hash all yield
    /// [`AppError::invalid_credentials`]. Empty input is rejected before the
    /// directory is consulted. Directory errors pass through unchanged.
    pub async fn login<D: UserDirectory>(&self, username: &str, secret: &str, dir: &D) -> AppResult<SessionPrincipal> {
        if username.trim().is_empty() {
            return Err(AppError::user("empty_username", "username is required"));
        }
        if secret.is_empty() {
            return Err(AppError::user("empty_secret", "password is required"));
        }
        match dir.lookup_by_username(username).await? {
            Some(identity) => {
                match self.verify_blocking(secret, &identity.secret_hash).await {
                    Ok(true) => {
                        info!(target: "carehub::auth", user_id = identity.id, role = %identity.role, "login succeeded");
                        Ok(identity.principal())
                    }
                    Ok(false) => {
                        warn!(target: "carehub::auth", username, "login rejected");
                        Err(AppError::invalid_credentials())
                    }
                    Err(AppError::InvalidFormat { code, .. }) => {
                        warn!(target: "carehub::auth", user_id = identity.id, code = %code, "stored hash unreadable; login rejected");
                        Err(AppError::invalid_credentials())
                    }
                    Err(e) => Err(e),
                }
            }
            None => {
                let _ = self.verify_blocking(secret, &self.decoy_hash).await;
                warn!(target: "carehub::auth", username, "login rejected");
                Err(AppError::invalid_credentials())
            }
        }
    }

    /// Validate and store a new account with a freshly hashed secret.
    pub async fn register<D: UserDirectory>(&self, req: NewUser, dir: &D) -> AppResult<Identity> {
        validation::validate_new_user(&req.username, &req.email, &req.secret, req.phone.as_deref())?;
        if dir.lookup_by_username(&req.username).await?.is_some() {
            return Err(AppError::conflict("username_taken".to_string(), format!("username '{}' already exists", req.username)));
        }
        let secret_hash = self.hash_blocking(&req.secret).await?;
        let identity = dir
            .insert(NewIdentity {
                username: req.username,
                secret_hash,
                role: req.role,
                email: req.email,
                phone: req.phone.filter(|p| !p.is_empty()),
                profile: req.profile,
            })
            .await?;
        info!(target: "carehub::auth", user_id = identity.id, role = %identity.role, "account registered");
        Ok(identity)
    }

    /// Re-read the account behind a live principal, e.g. for a profile page.
    pub async fn profile<D: UserDirectory>(&self, principal: &SessionPrincipal, dir: &D) -> AppResult<Identity> {
        match dir.lookup_by_id(principal.id).await? {
            Some(identity) if identity.role == principal.role => Ok(identity),
            Some(_) => Err(AppError::auth("role_changed", "account role changed; log in again")),
            None => Err(AppError::not_found("user_not_found".to_string(), format!("no account with id {}", principal.id))),
        }
    }
}
