//! Repository layer: persistence adapters for books and users

pub mod books;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::StoreError,
    models::{book::Book, user::{NewUser, User}},
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for book records.
///
/// Implementations must make `compare_and_swap` atomic for a single record:
/// the write only lands if the stored version still equals `book.version`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, isbn: &str) -> StoreResult<Option<Book>>;

    /// All books, ordered by isbn
    async fn list(&self) -> StoreResult<Vec<Book>>;

    /// Books whose holder set contains `user_id`, ordered by isbn
    async fn held_by(&self, user_id: i32) -> StoreResult<Vec<Book>>;

    /// Insert a new record; fails with `Duplicate` if the isbn is taken
    async fn insert(&self, book: &Book) -> StoreResult<Book>;

    /// Replace capacity and holders if the stored version matches `book.version`.
    /// Returns the stored record with its bumped version.
    async fn compare_and_swap(&self, book: &Book) -> StoreResult<Book>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Directory of registered users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists(&self, id: i32) -> StoreResult<bool>;

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup
    async fn get_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Fails with `Duplicate` if the username is taken (case-insensitively)
    async fn create(&self, user: &NewUser) -> StoreResult<User>;

    async fn list(&self) -> StoreResult<Vec<User>>;
}

/// Main repository struct holding the active adapters
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
}

impl Repository {
    pub fn new(books: Arc<dyn BookStore>, users: Arc<dyn UserStore>) -> Self {
        Self { books, users }
    }

    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(
            Arc::new(books::PgBookStore::new(pool.clone())),
            Arc::new(users::PgUserStore::new(pool)),
        )
    }

    /// Repository kept in process memory; contents are lost on restart
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(memory::MemoryBookStore::default()),
            Arc::new(memory::MemoryUserStore::default()),
        )
    }
}
