//! Read-only views over the catalog: free copies and per-user holdings.
//!
//! Reads go straight to the store without the ledger's per-book lock. Each
//! store read returns a whole record, so a concurrent borrow or return is seen
//! either entirely or not at all.

use crate::{
    error::{AppResult, LedgerError},
    models::book::{Book, BookDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
}

impl AvailabilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// `capacity - |holders|` for one book
    pub async fn availability(&self, isbn: &str) -> AppResult<u32> {
        Ok(self.details(isbn).await?.available_quantity)
    }

    /// A book together with its free copies
    pub async fn details(&self, isbn: &str) -> AppResult<BookDetails> {
        self.repository
            .books
            .get(isbn)
            .await?
            .map(BookDetails::from)
            .ok_or_else(|| LedgerError::ResourceNotFound(isbn.to_string()).into())
    }

    /// Books currently held by `user_id`
    pub async fn holdings_of(&self, user_id: i32) -> AppResult<Vec<Book>> {
        Ok(self.repository.books.held_by(user_id).await?)
    }
}
