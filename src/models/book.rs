//! Book (lendable resource) model and its hold transitions

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, LedgerError, StoreError};

/// A lendable book: at most `capacity` users may hold it at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    /// Catalog code, unique
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Number of copies that can be lent simultaneously
    pub capacity: u32,
    /// Ids of users currently holding a copy
    #[schema(value_type = Vec<i32>)]
    pub holders: BTreeSet<i32>,
    /// Incremented by the store on every persisted mutation
    pub version: i64,
}

impl Book {
    /// Build a new, unheld book from a creation request
    pub fn new(request: CreateBook) -> Result<Self, AppError> {
        let isbn = request.isbn.trim().to_string();
        if isbn.is_empty() {
            return Err(AppError::Validation("isbn must not be empty".to_string()));
        }
        let capacity = u32::try_from(request.capacity).map_err(|_| {
            AppError::Validation(format!(
                "capacity must be between 0 and {}, got {}",
                u32::MAX,
                request.capacity
            ))
        })?;

        Ok(Self {
            isbn,
            title: request.title,
            author: request.author,
            capacity,
            holders: BTreeSet::new(),
            version: 0,
        })
    }

    /// Free copies: `capacity - |holders|`
    pub fn availability(&self) -> u32 {
        self.capacity.saturating_sub(self.holders.len() as u32)
    }

    pub fn is_held_by(&self, user_id: i32) -> bool {
        self.holders.contains(&user_id)
    }

    /// The record after `user_id` takes a copy.
    ///
    /// A second hold by the same user is rejected before capacity is looked
    /// at, so a full book still reports `AlreadyHeld` to its own holders.
    pub fn with_holder(&self, user_id: i32) -> Result<Book, LedgerError> {
        if self.is_held_by(user_id) {
            return Err(LedgerError::AlreadyHeld {
                isbn: self.isbn.clone(),
                user_id,
            });
        }
        if self.holders.len() >= self.capacity as usize {
            return Err(LedgerError::CapacityExceeded {
                isbn: self.isbn.clone(),
                capacity: self.capacity,
            });
        }

        let mut next = self.clone();
        next.holders.insert(user_id);
        Ok(next)
    }

    /// The record after `user_id` gives their copy back
    pub fn without_holder(&self, user_id: i32) -> Result<Book, LedgerError> {
        if !self.is_held_by(user_id) {
            return Err(LedgerError::NotHeld {
                isbn: self.isbn.clone(),
                user_id,
            });
        }

        let mut next = self.clone();
        next.holders.remove(&user_id);
        Ok(next)
    }

    /// The record with a new capacity; never evicts current holders
    pub fn with_capacity(&self, capacity: u32) -> Result<Book, LedgerError> {
        if (capacity as usize) < self.holders.len() {
            return Err(LedgerError::CapacityBelowHolders {
                isbn: self.isbn.clone(),
                requested: capacity,
                holders: self.holders.len(),
            });
        }

        let mut next = self.clone();
        next.capacity = capacity;
        Ok(next)
    }
}

/// Book with computed availability, as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub available_quantity: u32,
}

impl From<Book> for BookDetails {
    fn from(book: Book) -> Self {
        let available_quantity = book.availability();
        Self {
            book,
            available_quantity,
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 64, message = "isbn must be 1-64 characters"))]
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    #[validate(range(min = 0, message = "capacity must not be negative"))]
    pub capacity: i64,
}

/// Database row for the `books` table
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub capacity: i64,
    pub holders: Vec<i32>,
    pub version: i64,
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(row.capacity)
            .map_err(|_| StoreError::Corrupt(format!("book {} has an out-of-range capacity", row.isbn)))?;
        let expected = row.holders.len();
        let holders: BTreeSet<i32> = row.holders.into_iter().collect();
        if holders.len() != expected || holders.len() > capacity as usize {
            return Err(StoreError::Corrupt(format!(
                "book {} has an invalid holder set",
                row.isbn
            )));
        }

        Ok(Book {
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            capacity,
            holders,
            version: row.version,
        })
    }
}
