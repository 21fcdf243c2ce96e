/// Authentication module
///
/// Access-token signing and verification, password hashing, refresh token
/// generation, and the verified caller identity.

mod claims;
mod identity;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use identity::Identity;
pub use jwt::TokenCodec;
pub use password::hash_password;
pub use password::hash_password_blocking;
pub use password::verify_password;
pub use password::verify_password_blocking;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::hash_token;
