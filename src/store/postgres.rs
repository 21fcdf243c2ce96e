/// PostgreSQL adapter for every store capability.
///
/// Reads run in a SERIALIZABLE transaction through the bounded retry helper.
/// Writes are single statements, or one short transaction for role changes,
/// and are not retried. Refresh tokens are stored as SHA-256 digests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::retry::{with_serialization_retry, RetryPolicy};
use super::{
    AdminFunctions, Entity, ProfileProvider, RoleProvider, RoleSetter, StoreError, TokenRepo,
    UserProvider, UserSaver,
};
use crate::auth::hash_token;
use crate::domain::{NewUser, RefreshTokenRecord, Role, UserProfile, UserRecord};

type ProfileRow = (i64, String, String, String, String, String);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgStore {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_serializable(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut tx)
            .await?;
        Ok(tx)
    }
}

fn parse_role(name: &str) -> Result<Role, StoreError> {
    name.parse::<Role>()
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn profile_from_row(row: ProfileRow) -> Result<UserProfile, StoreError> {
    let (id, username, email, display_name, phone_number, role) = row;
    Ok(UserProfile {
        id,
        username,
        email,
        display_name,
        phone_number,
        role: parse_role(&role)?,
    })
}

const PROFILE_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.display_name, u.phone_number, r.name
    FROM users u
    JOIN user_roles ur ON ur.user_id = u.id
    JOIN roles r ON r.id = ur.role_id
"#;

#[async_trait]
impl UserSaver for PgStore {
    async fn save_user(&self, user: &NewUser) -> Result<i64, StoreError> {
        let user_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (username, email, display_name, phone_number, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_id)
    }
}

#[async_trait]
impl UserProvider for PgStore {
    async fn user_by_username(&self, username: &str) -> Result<UserRecord, StoreError> {
        with_serialization_retry(self.retry, "store.user_by_username", move || async move {
            let mut tx = self.begin_serializable().await?;
            let row = sqlx::query_as::<_, (i64, String, String, String, String, String)>(
                r#"
                SELECT id, username, email, display_name, phone_number, password_hash
                FROM users
                WHERE username = $1
                "#,
            )
            .bind(username)
            .fetch_optional(&mut tx)
            .await?;
            tx.commit().await?;

            let (id, username, email, display_name, phone_number, password_hash) =
                row.ok_or(StoreError::NotFound(Entity::User))?;
            Ok::<_, StoreError>(UserRecord {
                id,
                username,
                email,
                display_name,
                phone_number,
                password_hash,
            })
        })
        .await
    }
}

#[async_trait]
impl RoleSetter for PgStore {
    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, r.id FROM roles r WHERE r.name = $2
            ON CONFLICT (user_id) DO UPDATE SET role_id = EXCLUDED.role_id
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(Entity::Role));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleProvider for PgStore {
    async fn role(&self, user_id: i64) -> Result<Role, StoreError> {
        with_serialization_retry(self.retry, "store.role", move || async move {
            let mut tx = self.begin_serializable().await?;
            let name = sqlx::query_scalar::<_, String>(
                r#"
                SELECT r.name
                FROM roles r
                JOIN user_roles ur ON ur.role_id = r.id
                WHERE ur.user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&mut tx)
            .await?;
            tx.commit().await?;

            parse_role(&name.ok_or(StoreError::NotFound(Entity::Role))?)
        })
        .await
    }
}

#[async_trait]
impl TokenRepo for PgStore {
    async fn save_refresh_token(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(hash_token(token))
        .bind(user_id)
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError> {
        let token_hash = hash_token(token);
        let token_hash = token_hash.as_str();

        with_serialization_retry(self.retry, "store.find_refresh_token", move || async move {
            let mut tx = self.begin_serializable().await?;
            let row = sqlx::query_as::<_, (i64, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                SELECT user_id, issued_at, expires_at
                FROM refresh_tokens
                WHERE token_hash = $1
                "#,
            )
            .bind(token_hash)
            .fetch_optional(&mut tx)
            .await?;
            tx.commit().await?;

            let (user_id, issued_at, expires_at) =
                row.ok_or(StoreError::NotFound(Entity::RefreshToken))?;
            Ok::<_, StoreError>(RefreshTokenRecord {
                user_id,
                issued_at,
                expires_at,
            })
        })
        .await
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        // A concurrent DELETE of the same row waits on the row lock and then
        // affects nothing, so at most one caller sees `true`.
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileProvider for PgStore {
    async fn profile(&self, user_id: i64) -> Result<UserProfile, StoreError> {
        let query = format!("{} WHERE u.id = $1", PROFILE_SELECT);
        let query = query.as_str();

        with_serialization_retry(self.retry, "store.profile", move || async move {
            let mut tx = self.begin_serializable().await?;
            let row = sqlx::query_as::<_, ProfileRow>(query)
                .bind(user_id)
                .fetch_optional(&mut tx)
                .await?;
            tx.commit().await?;

            profile_from_row(row.ok_or(StoreError::NotFound(Entity::User))?)
        })
        .await
    }
}

#[async_trait]
impl AdminFunctions for PgStore {
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        let query = format!("{} ORDER BY u.id, r.name", PROFILE_SELECT);
        let query = query.as_str();

        with_serialization_retry(self.retry, "store.list_profiles", move || async move {
            let mut tx = self.begin_serializable().await?;
            let rows = sqlx::query_as::<_, ProfileRow>(query)
                .fetch_all(&mut tx)
                .await?;
            tx.commit().await?;

            rows.into_iter()
                .map(profile_from_row)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn change_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let role_id = sqlx::query_scalar::<_, i32>("SELECT id FROM roles WHERE name = $1")
            .bind(role.as_str())
            .fetch_optional(&mut tx)
            .await?
            .ok_or(StoreError::NotFound(Entity::Role))?;

        let updated = sqlx::query("UPDATE user_roles SET role_id = $1 WHERE user_id = $2")
            .bind(role_id)
            .bind(user_id)
            .execute(&mut tx)
            .await?
            .rows_affected();
        if updated == 0 {
            // Dropping `tx` rolls back
            return Err(StoreError::NotFound(Entity::User));
        }

        tx.commit().await?;
        Ok(())
    }
}
