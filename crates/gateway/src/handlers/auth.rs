//! Registration, login and the current-user endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use incentive_common::{
    auth::{hash_password, verify_password, AuthContext},
    errors::{AppError, Result},
    records::bounded_text,
    store::{NewUser, Role, User},
};

use super::DataResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, message = "Please add a name"),
        custom(function = "bounded_text")
    )]
    pub name: String,

    #[validate(email(message = "Please add a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Please add an employee ID"),
        custom(function = "bounded_text")
    )]
    pub employee_id: String,

    #[validate(
        length(min = 1, message = "Please add a department"),
        custom(function = "bounded_text")
    )]
    pub department: String,

    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Please add a password"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    request.validate()?;

    let user = state
        .users
        .create(NewUser {
            name: request.name,
            email: request.email,
            password_hash: hash_password(&request.password)?,
            employee_id: request.employee_id,
            department: request.department,
            role: request.role,
        })
        .await?;
    let token = state.jwt.generate_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    request.validate()?;

    let user = state
        .users
        .find_by_email(&request.email)
        .await
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    tracing::info!(user_id = user.id, "User logged in");
    let token = state.jwt.generate_token(&user)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

pub async fn me(auth: AuthContext) -> Json<DataResponse<User>> {
    Json(DataResponse::new(auth.user))
}
