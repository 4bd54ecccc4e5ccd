//! In-process adapters, used by the `memory` storage backend and by tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{book::Book, user::{NewUser, User}},
};

use super::{BookStore, StoreResult, UserStore};

#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<HashMap<String, Book>>,
}

fn sorted(mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by(|a, b| a.isbn.cmp(&b.isbn));
    books
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn get(&self, isbn: &str) -> StoreResult<Option<Book>> {
        Ok(self.books.read().await.get(isbn).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Book>> {
        Ok(sorted(self.books.read().await.values().cloned().collect()))
    }

    async fn held_by(&self, user_id: i32) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        Ok(sorted(
            books
                .values()
                .filter(|book| book.is_held_by(user_id))
                .cloned()
                .collect(),
        ))
    }

    async fn insert(&self, book: &Book) -> StoreResult<Book> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.isbn) {
            return Err(StoreError::Duplicate(book.isbn.clone()));
        }
        let stored = Book {
            version: 0,
            ..book.clone()
        };
        books.insert(stored.isbn.clone(), stored.clone());
        Ok(stored)
    }

    async fn compare_and_swap(&self, book: &Book) -> StoreResult<Book> {
        let mut books = self.books.write().await;
        let current = books
            .get_mut(&book.isbn)
            .ok_or_else(|| StoreError::Missing(book.isbn.clone()))?;
        if current.version != book.version {
            return Err(StoreError::VersionConflict(book.isbn.clone()));
        }
        if book.holders.len() > book.capacity as usize {
            return Err(StoreError::Corrupt(format!(
                "book {} would exceed its capacity",
                book.isbn
            )));
        }

        current.capacity = book.capacity;
        current.holders = book.holders.clone();
        current.version += 1;
        Ok(current.clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct UserTable {
    next_id: i32,
    rows: HashMap<i32, User>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn exists(&self, id: i32) -> StoreResult<bool> {
        Ok(self.table.read().await.rows.contains_key(&id))
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::Duplicate(user.username.clone()));
        }

        table.next_id += 1;
        let created = User {
            id: table.next_id,
            username: user.username.clone(),
            password: user.password_hash.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.table.read().await.rows.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}
