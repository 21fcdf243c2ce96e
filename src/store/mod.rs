/// Credential Store
///
/// One trait per capability the services need, so each service can be
/// exercised against a fake of just the capability under test. `PgStore` and
/// `MemoryStore` implement all of them.

mod memory;
mod postgres;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::{NewUser, RefreshTokenRecord, Role, UserProfile, UserRecord};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use retry::RetryPolicy;

/// Kind of row a lookup missed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Role,
    RefreshToken,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Role => write!(f, "role"),
            Entity::RefreshToken => write!(f, "refresh token"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Duplicate,
    #[error("{0} not found")]
    NotFound(Entity),
    /// Serializable transaction aborted by a concurrent writer. Retried by
    /// [`retry::with_serialization_retry`], surfaced only once attempts run out.
    #[error("could not serialize transaction")]
    SerializationConflict,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

const UNIQUE_VIOLATION: &str = "23505";
// Every foreign key in the schema references `users`
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::Duplicate,
            Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound(Entity::User),
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                StoreError::SerializationConflict
            }
            _ => StoreError::Database(err),
        }
    }
}

#[async_trait]
pub trait UserSaver: Send + Sync {
    /// Insert a user and return the store-assigned id.
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn save_user(&self, user: &NewUser) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn user_by_username(&self, username: &str) -> Result<UserRecord, StoreError>;
}

#[async_trait]
pub trait RoleSetter: Send + Sync {
    /// Replace the user's role assignment.
    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RoleProvider: Send + Sync {
    async fn role(&self, user_id: i64) -> Result<Role, StoreError>;
}

#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn save_refresh_token(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn find_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError>;

    /// Delete a refresh token. Deleting an absent token is not an error; the
    /// return value tells whether this call removed a row, which is what lets
    /// exactly one of several concurrent redeemers win.
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn profile(&self, user_id: i64) -> Result<UserProfile, StoreError>;
}

#[async_trait]
pub trait AdminFunctions: Send + Sync {
    /// All profiles ordered by user id, then role name.
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError>;

    /// Fails with `NotFound(User)` or `NotFound(Role)`.
    async fn change_role(&self, user_id: i64, role: Role) -> Result<(), StoreError>;
}
