/// JWT Claims structure
///
/// Payload of an access token: who the caller is, which role they held when
/// the token was minted, and the validity window (RFC 7519 `iat`/`exp`).

use serde::{Deserialize, Serialize};

use crate::domain::Role;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Numeric user id assigned by the store
    pub user_id: i64,
    /// Role at issue time. Not refreshed until the token is re-minted.
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims valid from `issued_at` for `ttl_seconds`
    pub fn new(user_id: i64, role: Role, issued_at: i64, ttl_seconds: i64, issuer: String) -> Self {
        Self {
            user_id,
            role,
            exp: issued_at + ttl_seconds,
            iat: issued_at,
            iss: issuer,
        }
    }

    /// A token is expired at and after its `exp` instant
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(42, Role::Buyer, 1_000, 3600, "test".to_string());

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, Role::Buyer);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 4_600);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims::new(42, Role::Admin, 1_000, 60, "test".to_string());

        assert!(!claims.is_expired_at(1_000));
        assert!(!claims.is_expired_at(1_059));
        assert!(claims.is_expired_at(1_060));
    }
}
