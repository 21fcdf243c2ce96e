mod auth;
mod health_check;
mod profile;

pub use auth::{login, logout, refresh_token, register};
pub use auth::{RegisterResponse, Tokens, TokensResponse};
pub use health_check::health_check;
pub use profile::{change_role, get_profile, list_users};
