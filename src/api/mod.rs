//! API handlers for the circulation REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// JSON body extractor whose rejections are reported as [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameter extractor whose rejections are reported as [`AppError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Extractor for authenticated user from JWT token.
///
/// The decoded user id is handed to the services as a plain parameter; no
/// handler keeps a notion of a "current user" beyond this request.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/profile", get(users::profile))
        // Loans
        .route("/users/borrow", post(loans::borrow_book))
        .route("/users/return", post(loans::return_book))
        .route("/users/borrowed-books", get(loans::borrowed_books))
        .route("/users/:id/books", get(loans::user_books))
        // Books (catalog)
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:isbn", get(books::get_book))
        .route("/books/:isbn/availability", get(books::get_availability))
        .route("/books/:isbn/capacity", put(books::resize_book))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
