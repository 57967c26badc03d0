//! Input checks applied before anything reaches the user store.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{AppError, AppResult};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,20}$").expect("username pattern"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@([A-Za-z0-9.-]+\.[A-Za-z]{2,})$").expect("email pattern"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9\-+\s()]{10,20}$").expect("phone pattern"));

pub const MIN_SECRET_LEN: usize = 6;
pub const MAX_SECRET_LEN: usize = 128;

pub fn is_valid_username(s: &str) -> bool { USERNAME_RE.is_match(s) }

pub fn is_valid_email(s: &str) -> bool { EMAIL_RE.is_match(s) }

pub fn is_valid_phone(s: &str) -> bool { PHONE_RE.is_match(s) }

/// Length in characters, not bytes.
pub fn is_valid_secret(s: &str) -> bool {
    let n = s.chars().count();
    (MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&n)
}

pub fn is_valid_id(id: i64) -> bool { id > 0 }

/// Registration gate. Phone is optional but must be well formed when given.
pub fn validate_new_user(username: &str, email: &str, secret: &str, phone: Option<&str>) -> AppResult<()> {
    if !is_valid_username(username) {
        warn!(target: "carehub::auth", "registration rejected: bad username format");
        return Err(AppError::user("invalid_username", "username must be 3-20 letters, digits or underscores"));
    }
    if !is_valid_email(email) {
        return Err(AppError::user("invalid_email", "email address is not valid"));
    }
    if !is_valid_secret(secret) {
        return Err(AppError::user("invalid_secret".to_string(), format!("password must be {}-{} characters", MIN_SECRET_LEN, MAX_SECRET_LEN)));
    }
    if let Some(p) = phone.filter(|p| !p.is_empty()) {
        if !is_valid_phone(p) {
            return Err(AppError::user("invalid_phone", "phone number is not valid"));
        }
    }
    Ok(())
}
