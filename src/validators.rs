/// Input validators
///
/// Field rules applied by the route handlers before a service is called.
/// Lengths are counted in characters. Text fields are trimmed; passwords and
/// refresh tokens are taken verbatim.

use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::Role;
use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 30;
const MAX_EMAIL_LENGTH: usize = 100;
const MAX_DISPLAY_NAME_LENGTH: usize = 100;
const MIN_PHONE_LENGTH: usize = 7;
const MAX_PHONE_LENGTH: usize = 15;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 24;

lazy_static! {
    // RFC 5322 simplified email regex; the domain must end in an alphabetic TLD
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$"
    ).unwrap();

    // International format: leading plus, digits only
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+\d{5,}$").unwrap();
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length == 0 {
        return Err(ValidationError::EmptyField(field));
    }
    if length < min {
        return Err(ValidationError::TooShort(field, min));
    }
    if length > max {
        return Err(ValidationError::TooLong(field, max));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();
    check_length("username", trimmed, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH)?;
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat("username"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();
    check_length("email", trimmed, 1, MAX_EMAIL_LENGTH)?;
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_display_name(display_name: &str) -> Result<String, ValidationError> {
    let trimmed = display_name.trim();
    check_length("display_name", trimmed, 1, MAX_DISPLAY_NAME_LENGTH)?;
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat("display_name"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_phone_number(phone_number: &str) -> Result<String, ValidationError> {
    let trimmed = phone_number.trim();
    check_length("phone_number", trimmed, MIN_PHONE_LENGTH, MAX_PHONE_LENGTH)?;
    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("phone_number"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_length("password", password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
}

pub fn validate_user_id(user_id: i64) -> Result<i64, ValidationError> {
    if user_id <= 0 {
        return Err(ValidationError::NotPositive("user_id"));
    }
    Ok(user_id)
}

pub fn validate_refresh_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token"));
    }
    Ok(())
}

/// Role names are matched case-insensitively
pub fn validate_role(role: &str) -> Result<Role, ValidationError> {
    if role.trim().is_empty() {
        return Err(ValidationError::EmptyField("role"));
    }
    role.parse::<Role>()
        .map_err(|_| ValidationError::InvalidFormat("role"))
}
