//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppResult, LedgerError},
    models::book::{Book, CreateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a book by isbn
    pub async fn get(&self, isbn: &str) -> AppResult<Book> {
        self.repository
            .books
            .get(isbn)
            .await?
            .ok_or_else(|| LedgerError::ResourceNotFound(isbn.to_string()).into())
    }

    /// List every book in the catalog
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.repository.books.list().await?)
    }

    /// Add a book; its holder set starts empty
    pub async fn create(&self, request: CreateBook) -> AppResult<Book> {
        request.validate()?;
        let book = Book::new(request)?;
        let created = self.repository.books.insert(&book).await?;
        tracing::info!(isbn = %created.isbn, capacity = created.capacity, "Book added to catalog");
        Ok(created)
    }

    /// Check the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        Ok(self.repository.books.ping().await?)
    }
}
