/// Domain types shared by the services, the store and the transport layer.

mod role;
mod token;
mod user;

pub use role::Role;
pub use role::UnknownRole;
pub use token::RefreshTokenRecord;
pub use token::TokenPair;
pub use user::NewUser;
pub use user::UserProfile;
pub use user::UserRecord;
