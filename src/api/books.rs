//! Book (catalog) endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{BookDetails, CreateBook},
};

use super::{AppJson, AppPath, AuthenticatedUser};

/// Catalog listing
#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookDetails>,
}

/// Free copies of one book
#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub isbn: String,
    pub available_quantity: u32,
}

/// Capacity change request
#[derive(Deserialize, Validate, ToSchema)]
pub struct ResizeRequest {
    #[validate(range(min = 0, message = "capacity must not be negative"))]
    pub capacity: i64,
}

/// List all books with their availability
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All books", body = BookListResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<BookListResponse>> {
    let books = state.services.catalog.list().await?;
    Ok(Json(BookListResponse {
        books: books.into_iter().map(BookDetails::from).collect(),
    }))
}

/// Get one book with its availability
#[utoipa::path(
    get,
    path = "/books/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    AppPath(isbn): AppPath<String>,
) -> AppResult<Json<BookDetails>> {
    let details = state.services.availability.details(&isbn).await?;
    Ok(Json(details))
}

/// Number of free copies of a book
#[utoipa::path(
    get,
    path = "/books/{isbn}/availability",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Free copies", body = AvailabilityResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    AppPath(isbn): AppPath<String>,
) -> AppResult<Json<AvailabilityResponse>> {
    let available_quantity = state.services.availability.availability(&isbn).await?;
    Ok(Json(AvailabilityResponse {
        isbn,
        available_quantity,
    }))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid isbn or capacity"),
        (status = 403, description = "Administrator privileges required"),
        (status = 409, description = "ISBN already exists")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    claims.require_admin()?;

    let book = state.services.catalog.create(request).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// Change how many copies of a book can be lent at once
#[utoipa::path(
    put,
    path = "/books/{isbn}/capacity",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    request_body = ResizeRequest,
    responses(
        (status = 200, description = "Book resized", body = BookDetails),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "More copies are held than the new capacity")
    )
)]
pub async fn resize_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(isbn): AppPath<String>,
    AppJson(request): AppJson<ResizeRequest>,
) -> AppResult<Json<BookDetails>> {
    claims.require_admin()?;
    request.validate()?;
    let capacity = u32::try_from(request.capacity)
        .map_err(|_| AppError::Validation(format!("capacity {} is out of range", request.capacity)))?;

    let book = state.services.ledger.resize(&isbn, capacity).await?;
    Ok(Json(book.into()))
}
