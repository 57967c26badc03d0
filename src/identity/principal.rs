use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Doctor, Role::Patient];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    /// Case-insensitive match on the tag; anything else, including surrounding
    /// whitespace, is `None` so callers fail closed.
    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Role-specific data carried alongside an [`Identity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleProfile {
    Admin {
        #[serde(default)]
        department: Option<String>,
    },
    Doctor {
        specialization: String,
        #[serde(default)]
        years_of_experience: u32,
        license_number: String,
        #[serde(default)]
        consultation_fee: f64,
        #[serde(default = "default_available")]
        available: bool,
    },
    Patient {
        #[serde(default)]
        date_of_birth: Option<String>,
        #[serde(default)]
        blood_group: Option<String>,
        #[serde(default)]
        allergies: Vec<String>,
        #[serde(default)]
        emergency_contact: Option<String>,
    },
}

fn default_available() -> bool { true }

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Admin { .. } => Role::Admin,
            RoleProfile::Doctor { .. } => Role::Doctor,
            RoleProfile::Patient { .. } => Role::Patient,
        }
    }
}

/// A stored user account. `secret_hash` only ever holds output of
/// [`crate::credentials::CredentialService::hash`].
#[derive(Clone, PartialEq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub secret_hash: String,
    pub role: Role,
    pub email: String,
    pub phone: Option<String>,
    pub profile: Option<RoleProfile>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Attach a profile; ignored when it belongs to a different role.
    pub fn with_profile(mut self, profile: RoleProfile) -> Self {
        if profile.role() == self.role { self.profile = Some(profile); }
        self
    }

    pub fn principal(&self) -> SessionPrincipal {
        SessionPrincipal { id: self.id, role: self.role }
    }
}

/// The authenticated subject of one interactive session. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionPrincipal {
    pub id: i64,
    pub role: Role,
}
