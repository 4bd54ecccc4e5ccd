//! Registration, login and user directory endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{RegisterUser, User},
};

use super::{AppJson, AuthenticatedUser};

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response carrying the bearer token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub user: User,
}

/// Single user wrapper
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub user: User,
}

/// User list wrapper
#[derive(Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid username, password or role"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Log in and obtain a bearer token
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        user,
    }))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn profile(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(UserResponse { user }))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = UsersResponse),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UsersResponse>> {
    claims.require_admin()?;

    let users = state.services.users.list().await?;
    Ok(Json(UsersResponse { users }))
}
