/// Credential lifecycle
///
/// Registration, password login, refresh-token rotation and logout. A refresh
/// token is redeemed at most once: the row is deleted before a replacement is
/// minted, and only the caller whose delete removed the row may continue.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::auth::{
    generate_refresh_token, hash_password_blocking, verify_password_blocking, TokenCodec,
};
use crate::configuration::Settings;
use crate::domain::{NewUser, Role, TokenPair};
use crate::error::{AppError, AuthError};
use crate::store::{
    Entity, RoleProvider, RoleSetter, StoreError, TokenRepo, UserProvider, UserSaver,
};

/// Lifetimes and registration defaults used by [`CredentialService`]
#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub default_role: Role,
    pub bcrypt_cost: u32,
}

impl CredentialSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            access_ttl: Duration::seconds(settings.jwt.access_token_expiry),
            refresh_ttl: Duration::seconds(settings.jwt.refresh_token_expiry),
            default_role: settings.auth.default_role,
            bcrypt_cost: settings.auth.bcrypt_cost,
        }
    }
}

/// The store capabilities the credential service depends on
#[derive(Clone)]
pub struct CredentialStores {
    pub user_saver: Arc<dyn UserSaver>,
    pub user_provider: Arc<dyn UserProvider>,
    pub role_setter: Arc<dyn RoleSetter>,
    pub role_provider: Arc<dyn RoleProvider>,
    pub tokens: Arc<dyn TokenRepo>,
}

impl CredentialStores {
    /// Use one store for every capability
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserSaver + UserProvider + RoleSetter + RoleProvider + TokenRepo + 'static,
    {
        Self {
            user_saver: store.clone(),
            user_provider: store.clone(),
            role_setter: store.clone(),
            role_provider: store.clone(),
            tokens: store,
        }
    }
}

#[derive(Clone)]
pub struct CredentialService {
    stores: CredentialStores,
    codec: TokenCodec,
    settings: CredentialSettings,
}

impl CredentialService {
    pub fn new(stores: CredentialStores, codec: TokenCodec, settings: CredentialSettings) -> Self {
        Self {
            stores,
            codec,
            settings,
        }
    }

    /// Lifetime of the access tokens this service mints
    pub fn access_ttl(&self) -> Duration {
        self.settings.access_ttl
    }

    /// Create an account holding the default role. No tokens are issued.
    ///
    /// # Errors
    /// - `DuplicateUser` if the username is taken
    /// - `Storage` for any other store failure
    #[tracing::instrument(name = "credentials.register", skip(self, password, email, phone_number))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        display_name: &str,
        phone_number: &str,
        password: &str,
    ) -> Result<i64, AppError> {
        let password_hash =
            hash_password_blocking(password.to_string(), self.settings.bcrypt_cost).await?;

        let user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            phone_number: phone_number.to_string(),
            password_hash,
        };
        let user_id = self
            .stores
            .user_saver
            .save_user(&user)
            .await
            .map_err(|e| AppError::storage("credentials.register.save_user", e))?;

        self.stores
            .role_setter
            .set_role(user_id, self.settings.default_role)
            .await
            .map_err(|e| AppError::storage("credentials.register.set_role", e))?;

        tracing::info!(user_id = user_id, role = %self.settings.default_role, "User registered");
        Ok(user_id)
    }

    /// Exchange a username and password for a token pair.
    ///
    /// An unknown username and a wrong password fail identically.
    #[tracing::instrument(name = "credentials.login", skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = match self.stores.user_provider.user_by_username(username).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                tracing::debug!("Unknown username");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(AppError::storage("credentials.login.user_by_username", e)),
        };

        let password_valid =
            verify_password_blocking(password.to_string(), user.password_hash).await?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let role = self.current_role(user.id, "credentials.login.role").await?;
        let tokens = self.issue_pair(user.id, role, "credentials.login").await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(tokens)
    }

    /// Redeem a refresh token for a new pair. The old token is consumed.
    ///
    /// Unknown, already redeemed and expired tokens all fail with
    /// `InvalidToken`. A failure after the old token is consumed leaves the
    /// caller logged out.
    #[tracing::instrument(name = "credentials.refresh", skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let record = match self.stores.tokens.find_refresh_token(refresh_token).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Err(AuthError::InvalidToken.into()),
            Err(e) => return Err(AppError::storage("credentials.refresh.find", e)),
        };

        let removed = self
            .stores
            .tokens
            .delete_refresh_token(refresh_token)
            .await
            .map_err(|e| AppError::storage("credentials.refresh.delete", e))?;
        if !removed {
            tracing::warn!(user_id = record.user_id, "Refresh token already redeemed");
            return Err(AuthError::InvalidToken.into());
        }

        if record.is_expired_at(Utc::now()) {
            tracing::debug!(user_id = record.user_id, "Refresh token expired");
            return Err(AuthError::InvalidToken.into());
        }

        let role = self
            .current_role(record.user_id, "credentials.refresh.role")
            .await?;
        let tokens = self
            .issue_pair(record.user_id, role, "credentials.refresh")
            .await?;

        tracing::info!(user_id = record.user_id, "Tokens refreshed");
        Ok(tokens)
    }

    /// Revoke a refresh token. Revoking an unknown token succeeds.
    #[tracing::instrument(name = "credentials.logout", skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let removed = self
            .stores
            .tokens
            .delete_refresh_token(refresh_token)
            .await
            .map_err(|e| AppError::storage("credentials.logout.delete", e))?;

        tracing::info!(removed = removed, "Logout");
        Ok(())
    }

    async fn current_role(&self, user_id: i64, op: &'static str) -> Result<Role, AppError> {
        match self.stores.role_provider.role(user_id).await {
            Ok(role) => Ok(role),
            Err(StoreError::NotFound(Entity::Role)) => {
                tracing::error!(user_id = user_id, "User has no role assignment");
                Err(AppError::Internal(format!("no role assigned to user {}", user_id)))
            }
            Err(e) => Err(AppError::storage(op, e)),
        }
    }

    async fn issue_pair(
        &self,
        user_id: i64,
        role: Role,
        op: &'static str,
    ) -> Result<TokenPair, AppError> {
        let access_token = self.codec.issue(user_id, role, self.settings.access_ttl)?;

        let refresh_token = generate_refresh_token();
        let expires_at = Utc::now() + self.settings.refresh_ttl;
        self.stores
            .tokens
            .save_refresh_token(&refresh_token, user_id, expires_at)
            .await
            .map_err(|e| match e {
                // A collision between two 64-character random tokens
                StoreError::Duplicate => AppError::Internal("refresh token collision".to_string()),
                e => AppError::storage(op, e),
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
