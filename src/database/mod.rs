//! Storage plumbing shared by every data-access collaborator.

mod connection;
mod postgres;
mod users;

pub use connection::{ConnectionHandle, ConnectionManager, Connector, ManagerCell};
pub use postgres::{PgConnector, PgHandle};
pub use users::{PgUserDirectory, USERS_DDL};
