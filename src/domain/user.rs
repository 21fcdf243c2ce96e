use serde::Serialize;
use std::fmt;

use super::Role;

/// Fields supplied at registration, with the password already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("phone_number", &self.phone_number)
            .field("password_hash", &"[redacted]")
            .finish()
    }
}

/// A stored user, as read back for login.
#[derive(Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("phone_number", &self.phone_number)
            .field("password_hash", &"[redacted]")
            .finish()
    }
}

/// Public view of a user together with the role currently assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_password_hash() {
        let user = UserRecord {
            id: 7,
            username: "alice123".to_string(),
            email: "alice@x.com".to_string(),
            display_name: "Alice".to_string(),
            phone_number: "+1234567".to_string(),
            password_hash: "$2b$04$secretsecretsecret".to_string(),
        };

        let rendered = format!("{:?}", user);
        assert!(rendered.contains("alice123"));
        assert!(!rendered.contains("secretsecret"));
    }
}
