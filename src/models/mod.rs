//! Data models for the circulation server

pub mod book;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookDetails, CreateBook};
pub use user::{Role, User, UserClaims};
