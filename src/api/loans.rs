//! Borrow and return endpoints

use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookDetails},
};

use super::{AppJson, AppPath, AuthenticatedUser};

/// Borrow or return request
#[derive(Deserialize, Validate, ToSchema)]
pub struct HoldRequest {
    /// Book to borrow or return
    #[validate(length(min = 1, message = "isbn is required"))]
    pub isbn: String,
    /// User the operation is for; defaults to the caller (admin only when different)
    pub user_id: Option<i32>,
}

/// Updated book after a borrow or return
#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub book: BookDetails,
}

/// Books held by a user
#[derive(Serialize, ToSchema)]
pub struct BooksResponse {
    pub books: Vec<Book>,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/users/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = HoldRequest,
    responses(
        (status = 200, description = "Book borrowed", body = BookResponse),
        (status = 403, description = "Borrowing for another user requires admin"),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "Already held or no copy available"),
        (status = 503, description = "Storage temporarily unavailable")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<HoldRequest>,
) -> AppResult<Json<BookResponse>> {
    request.validate()?;
    let user_id = claims.acting_for(request.user_id)?;

    let book = state.services.ledger.borrow(&request.isbn, user_id).await?;
    Ok(Json(BookResponse { book: book.into() }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/users/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = HoldRequest,
    responses(
        (status = 200, description = "Book returned", body = BookResponse),
        (status = 403, description = "Returning for another user requires admin"),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "Book not held by the user"),
        (status = 503, description = "Storage temporarily unavailable")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<HoldRequest>,
) -> AppResult<Json<BookResponse>> {
    request.validate()?;
    let user_id = claims.acting_for(request.user_id)?;

    let book = state.services.ledger.return_book(&request.isbn, user_id).await?;
    Ok(Json(BookResponse { book: book.into() }))
}

/// Books held by the authenticated user
#[utoipa::path(
    get,
    path = "/users/borrowed-books",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books held by the caller", body = BooksResponse)
    )
)]
pub async fn borrowed_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BooksResponse>> {
    let books = state.services.availability.holdings_of(claims.user_id).await?;
    Ok(Json(BooksResponse { books }))
}

/// Books held by a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/books",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Books held by the user", body = BooksResponse),
        (status = 403, description = "Only admins may view other users"),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<BooksResponse>> {
    let user_id = claims.acting_for(Some(user_id))?;

    // Verify user exists
    state.services.users.get_by_id(user_id).await?;
    let books = state.services.availability.holdings_of(user_id).await?;
    Ok(Json(BooksResponse { books }))
}
