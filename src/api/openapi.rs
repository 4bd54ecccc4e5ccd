//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.1.0",
        description = "Book lending ledger REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Users
        users::register,
        users::login,
        users::profile,
        users::list_users,
        // Loans
        loans::borrow_book,
        loans::return_book,
        loans::borrowed_books,
        loans::user_books,
        // Books
        books::list_books,
        books::get_book,
        books::get_availability,
        books::create_book,
        books::resize_book,
    ),
    components(
        schemas(
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::RegisterUser,
            users::LoginRequest,
            users::LoginResponse,
            users::UserResponse,
            users::UsersResponse,
            // Loans
            loans::HoldRequest,
            loans::BookResponse,
            loans::BooksResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            books::BookListResponse,
            books::AvailabilityResponse,
            books::ResizeRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration and authentication"),
        (name = "loans", description = "Borrowing and returning books"),
        (name = "books", description = "Catalog and availability")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
