/// Credential Routes
///
/// Register, Login, RefreshToken and Logout. All four are public: the
/// interceptor lets them through without inspecting the caller.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::TokenPair;
use crate::error::AppError;
use crate::services::CredentialService;
use crate::validators::{
    validate_display_name, validate_email, validate_password, validate_phone_number,
    validate_refresh_token, validate_username,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of RefreshToken and Logout
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: i64,
}

#[derive(Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize, Deserialize)]
pub struct TokensResponse {
    pub tokens: Tokens,
}

impl TokensResponse {
    fn new(pair: TokenPair, credentials: &CredentialService) -> Self {
        Self {
            tokens: Tokens {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: credentials.access_ttl().num_seconds(),
            },
        }
    }
}

/// POST /user_profile.UserService/Register
///
/// # Errors
/// - 400: a field fails validation
/// - 409: username already registered
/// - 500: store failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    credentials: web::Data<CredentialService>,
) -> Result<HttpResponse, AppError> {
    let username = validate_username(&form.username)?;
    let email = validate_email(&form.email)?;
    let display_name = validate_display_name(&form.display_name)?;
    let phone_number = validate_phone_number(&form.phone_number)?;
    validate_password(&form.password)?;

    let user_id = credentials
        .register(&username, &email, &display_name, &phone_number, &form.password)
        .await?;

    Ok(HttpResponse::Created().json(RegisterResponse { user_id }))
}

/// POST /user_profile.UserService/Login
///
/// Unknown usernames and wrong passwords both answer 401 with the same body.
pub async fn login(
    form: web::Json<LoginRequest>,
    credentials: web::Data<CredentialService>,
) -> Result<HttpResponse, AppError> {
    let username = validate_username(&form.username)?;
    validate_password(&form.password)?;

    let pair = credentials.login(&username, &form.password).await?;

    Ok(HttpResponse::Ok().json(TokensResponse::new(pair, &credentials)))
}

/// POST /user_profile.UserService/RefreshToken
///
/// The presented token is consumed; a second use answers 401.
pub async fn refresh_token(
    form: web::Json<RefreshTokenRequest>,
    credentials: web::Data<CredentialService>,
) -> Result<HttpResponse, AppError> {
    validate_refresh_token(&form.refresh_token)?;

    let pair = credentials.refresh(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(TokensResponse::new(pair, &credentials)))
}

/// POST /user_profile.UserService/Logout
pub async fn logout(
    form: web::Json<RefreshTokenRequest>,
    credentials: web::Data<CredentialService>,
) -> Result<HttpResponse, AppError> {
    validate_refresh_token(&form.refresh_token)?;

    credentials.logout(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({})))
}
