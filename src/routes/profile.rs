/// Profile Routes
///
/// GetProfile needs any verified caller; ListUsers and ChangeRole are
/// admin-only, enforced before these handlers run.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::domain::UserProfile;
use crate::error::AppError;
use crate::services::ProfileService;
use crate::validators::{validate_role, validate_user_id};

#[derive(Deserialize)]
pub struct GetProfileRequest {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub user_id: i64,
    pub role: String,
}

#[derive(Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserProfile>,
}

/// POST /user_profile.UserService/GetProfile
///
/// # Errors
/// - 403: a non-admin asking for someone else's profile
/// - 404: no such user
pub async fn get_profile(
    form: web::Json<GetProfileRequest>,
    identity: web::ReqData<Identity>,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse, AppError> {
    let user_id = validate_user_id(form.user_id)?;

    let profile = profiles.get_profile(&identity, user_id).await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// POST /user_profile.UserService/ListUsers
pub async fn list_users(profiles: web::Data<ProfileService>) -> Result<HttpResponse, AppError> {
    let users = profiles.list_profiles().await?;

    Ok(HttpResponse::Ok().json(ListUsersResponse { users }))
}

/// POST /user_profile.UserService/ChangeRole
///
/// # Errors
/// - 400: unknown role name or non-positive id
/// - 404: no such user
pub async fn change_role(
    form: web::Json<ChangeRoleRequest>,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse, AppError> {
    let user_id = validate_user_id(form.user_id)?;
    let role = validate_role(&form.role)?;

    profiles.change_role(user_id, role).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({})))
}
