//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::StoreError,
    models::book::{Book, BookRow},
};

use super::{BookStore, StoreResult};

const BOOK_COLUMNS: &str = "isbn, title, author, capacity, holders, version";

#[derive(Clone)]
pub struct PgBookStore {
    pool: Pool<Postgres>,
}

impl PgBookStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn holders_vec(book: &Book) -> Vec<i32> {
    book.holders.iter().copied().collect()
}

fn into_books(rows: Vec<BookRow>) -> StoreResult<Vec<Book>> {
    rows.into_iter().map(Book::try_from).collect()
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn get(&self, isbn: &str) -> StoreResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>(&format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::try_from)
            .transpose()
    }

    async fn list(&self) -> StoreResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books ORDER BY isbn",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        into_books(rows)
    }

    async fn held_by(&self, user_id: i32) -> StoreResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE $1 = ANY(holders) ORDER BY isbn",
            BOOK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_books(rows)
    }

    async fn insert(&self, book: &Book) -> StoreResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            INSERT INTO books (isbn, title, author, capacity, holders, version)
            VALUES ($1, $2, $3, $4, $5, 0)
            ON CONFLICT (isbn) DO NOTHING
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.capacity as i64)
        .bind(holders_vec(book))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Duplicate(book.isbn.clone()))?;

        Book::try_from(row)
    }

    async fn compare_and_swap(&self, book: &Book) -> StoreResult<Book> {
        // The version predicate makes this a single-row CAS; the table's CHECK
        // constraints reject any write that would break the holder invariants.
        let updated = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            UPDATE books
            SET capacity = $2, holders = $3, version = version + 1
            WHERE isbn = $1 AND version = $4
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.isbn)
        .bind(book.capacity as i64)
        .bind(holders_vec(book))
        .bind(book.version)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Book::try_from(row),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                        .bind(&book.isbn)
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    Err(StoreError::VersionConflict(book.isbn.clone()))
                } else {
                    Err(StoreError::Missing(book.isbn.clone()))
                }
            }
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
