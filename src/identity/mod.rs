//! Accounts, login and role-based access for the three carehub roles.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod directory;
mod provider;
mod session;
mod authorizer;

pub use principal::{Identity, Role, RoleProfile, SessionPrincipal};
pub use directory::{InMemoryUserDirectory, NewIdentity, UserDirectory};
pub use provider::{AuthSession, NewUser};
pub use session::{Session, SessionStore, SessionToken};
pub use authorizer::{AccessController, Capability, MenuItem};
