/// Table-driven access control
///
/// Every inbound method is classified as public, authenticated or gated on a
/// set of roles. Non-public calls must carry exactly one
/// `authorization: Bearer <token>` value; the verified claims become the
/// caller's [`Identity`]. The decision is independent of any transport.

use std::collections::HashMap;
use std::future::Future;

use crate::auth::{Identity, TokenCodec};
use crate::domain::Role;
use crate::error::AuthError;

/// Method identities served by this process
pub mod methods {
    pub const REGISTER: &str = "/user_profile.UserService/Register";
    pub const LOGIN: &str = "/user_profile.UserService/Login";
    pub const REFRESH_TOKEN: &str = "/user_profile.UserService/RefreshToken";
    pub const LOGOUT: &str = "/user_profile.UserService/Logout";
    pub const GET_PROFILE: &str = "/user_profile.UserService/GetProfile";
    pub const LIST_USERS: &str = "/user_profile.UserService/ListUsers";
    pub const CHANGE_ROLE: &str = "/user_profile.UserService/ChangeRole";
    pub const HEALTH_CHECK: &str = "/health_check";
}

const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Roles(&'static [Role]),
}

/// Method identity to access tier. Unlisted methods require authentication.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    entries: HashMap<&'static str, Access>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: &'static str, access: Access) -> Self {
        self.entries.insert(method, access);
        self
    }

    pub fn access(&self, method: &str) -> Access {
        self.entries
            .get(method)
            .copied()
            .unwrap_or(Access::Authenticated)
    }

    /// The tiers of the user service
    pub fn user_service() -> Self {
        Self::new()
            .with(methods::REGISTER, Access::Public)
            .with(methods::LOGIN, Access::Public)
            .with(methods::REFRESH_TOKEN, Access::Public)
            .with(methods::LOGOUT, Access::Public)
            .with(methods::HEALTH_CHECK, Access::Public)
            .with(methods::GET_PROFILE, Access::Authenticated)
            .with(methods::LIST_USERS, Access::Roles(ADMIN_ONLY))
            .with(methods::CHANGE_ROLE, Access::Roles(ADMIN_ONLY))
    }
}

/// Call metadata. Keys are case-insensitive and may repeat.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    values: HashMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Outcome of a successful authorization. `identity` is `None` for public
/// methods, which are never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub method: String,
    pub identity: Option<Identity>,
}

#[derive(Clone)]
pub struct AuthInterceptor {
    table: MethodTable,
    codec: TokenCodec,
}

impl AuthInterceptor {
    pub fn new(table: MethodTable, codec: TokenCodec) -> Self {
        Self { table, codec }
    }

    /// Decide whether `method` may run with the given metadata.
    ///
    /// # Errors
    /// - `Unauthenticated` for a missing, repeated or malformed authorization
    ///   value, or a token that fails verification
    /// - `PermissionDenied` when the caller's role is outside the method's set
    pub fn authorize(&self, method: &str, metadata: &Metadata) -> Result<CallContext, AuthError> {
        let access = self.table.access(method);
        if access == Access::Public {
            return Ok(CallContext {
                method: method.to_string(),
                identity: None,
            });
        }

        let token = bearer_token(metadata)?;
        let claims = self.codec.verify(token).map_err(|_| {
            tracing::debug!(method = method, "Access token rejected");
            AuthError::Unauthenticated
        })?;

        if let Access::Roles(allowed) = access {
            if !allowed.contains(&claims.role) {
                tracing::warn!(
                    method = method,
                    user_id = claims.user_id,
                    role = %claims.role,
                    "Role not permitted"
                );
                return Err(AuthError::PermissionDenied("insufficient role"));
            }
        }

        Ok(CallContext {
            method: method.to_string(),
            identity: Some(Identity::from(&claims)),
        })
    }

    /// Run `handler` only if `method` is authorized.
    pub async fn intercept<F, Fut, T, E>(
        &self,
        method: &str,
        metadata: &Metadata,
        handler: F,
    ) -> Result<T, E>
    where
        F: FnOnce(CallContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthError>,
    {
        let context = self.authorize(method, metadata)?;
        handler(context).await
    }
}

/// Extract the token from the single `authorization` value
fn bearer_token(metadata: &Metadata) -> Result<&str, AuthError> {
    let value = match metadata.get_all("authorization") {
        [value] => value,
        _ => return Err(AuthError::Unauthenticated),
    };

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(*token),
        _ => Err(AuthError::Unauthenticated),
    }
}
