/// Access token codec
///
/// Signs and verifies HS256 access tokens. Verification is local: it needs
/// the secret and the clock, never the store.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::domain::Role;
use crate::error::{AppError, AuthError};

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenCodec {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    pub fn from_settings(config: &JwtSettings) -> Self {
        Self::new(&config.secret, config.issuer.clone())
    }

    /// Issue an access token valid from now for `ttl`
    ///
    /// # Errors
    /// Returns error if token generation fails
    pub fn issue(&self, user_id: i64, role: Role, ttl: Duration) -> Result<String, AppError> {
        self.issue_at(user_id, role, ttl, Utc::now().timestamp())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        role: Role,
        ttl: Duration,
        now: i64,
    ) -> Result<String, AppError> {
        let claims = Claims::new(user_id, role, now, ttl.num_seconds(), self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate and extract claims from an access token
    ///
    /// # Errors
    /// `InvalidToken` if the token is malformed, tampered with, from another
    /// issuer, carries an unknown role, or is expired
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Expiry is checked against `now` below, without leeway
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation error: {}", e);
                AuthError::InvalidToken
            })?;

        if claims.is_expired_at(now) {
            tracing::debug!(user_id = claims.user_id, "JWT expired");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, "test")
    }

    #[test]
    fn test_issue_and_verify_token() {
        let codec = codec();

        let token = codec
            .issue(7, Role::Buyer, Duration::minutes(15))
            .expect("Failed to generate token");
        let claims = codec.verify(&token).expect("Failed to validate token");

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, Role::Buyer);
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_valid_at_issue_time_and_invalid_at_expiry() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let token = codec.issue_at(7, Role::Admin, Duration::seconds(60), now).unwrap();

        assert!(codec.verify_at(&token, now).is_ok());
        assert!(codec.verify_at(&token, now + 59).is_ok());
        assert_eq!(codec.verify_at(&token, now + 60), Err(AuthError::InvalidToken));
        assert_eq!(codec.verify_at(&token, now + 3600), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(codec().verify("invalid.token.here"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_token() {
        let codec = codec();
        let token = codec.issue(7, Role::Buyer, Duration::minutes(15)).unwrap();

        // Flip one character in each of header, payload and signature
        let parts: Vec<&str> = token.split('.').collect();
        for i in 0..parts.len() {
            let mut tampered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
            let first = if tampered[i].starts_with('A') { "B" } else { "A" };
            tampered[i].replace_range(0..1, first);

            let result = codec.verify(&tampered.join("."));
            assert_eq!(result, Err(AuthError::InvalidToken), "segment {} was tampered", i);
        }
    }

    #[test]
    fn test_wrong_secret() {
        let token = codec().issue(7, Role::Buyer, Duration::minutes(15)).unwrap();
        let other = TokenCodec::new("another-secret-key-of-reasonable-length", "test");

        assert_eq!(other.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer() {
        let token = codec().issue(7, Role::Buyer, Duration::minutes(15)).unwrap();
        let other = TokenCodec::new(SECRET, "wrong-issuer");

        assert_eq!(other.verify(&token), Err(AuthError::InvalidToken));
    }
}
