use crate::auth::Claims;
use crate::domain::Role;
use crate::error::AuthError;

/// Caller identity established by the authorization interceptor from a
/// verified access token. Handlers read it instead of re-parsing headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Callers may act on their own account; admins may act on any account.
    pub fn ensure_self_or_admin(&self, user_id: i64) -> Result<(), AuthError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied("access to another user's profile"))
        }
    }
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
        }
    }
}
