//! Lending ledger: the only writer of a book's holder set.
//!
//! Every mutation of a given book runs under that book's async mutex and is
//! persisted with a version-checked compare-and-swap, so two requests racing
//! for the last copy can never both win, even across server processes sharing
//! one database. Transient store failures are retried a bounded number of
//! times; each attempt re-reads the record, so a retry never applies a
//! decision taken on stale state.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;

use crate::{
    config::LedgerConfig,
    error::{LedgerError, StoreError},
    models::book::Book,
    repository::Repository,
};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
    config: LedgerConfig,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LedgerService {
    pub fn new(repository: Repository, config: LedgerConfig) -> Self {
        Self {
            repository,
            config,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Give `user_id` one copy of `isbn`
    #[tracing::instrument(skip(self))]
    pub async fn borrow(&self, isbn: &str, user_id: i32) -> Result<Book, LedgerError> {
        let book = self
            .apply(isbn, Some(user_id), |book| book.with_holder(user_id))
            .await?;
        tracing::info!(available = book.availability(), "Book borrowed");
        Ok(book)
    }

    /// Take back the copy of `isbn` held by `user_id`
    #[tracing::instrument(skip(self))]
    pub async fn return_book(&self, isbn: &str, user_id: i32) -> Result<Book, LedgerError> {
        let book = self
            .apply(isbn, Some(user_id), |book| book.without_holder(user_id))
            .await?;
        tracing::info!(available = book.availability(), "Book returned");
        Ok(book)
    }

    /// Change the number of copies; refuses to drop below the current holders
    #[tracing::instrument(skip(self))]
    pub async fn resize(&self, isbn: &str, capacity: u32) -> Result<Book, LedgerError> {
        let book = self
            .apply(isbn, None, |book| book.with_capacity(capacity))
            .await?;
        tracing::info!(capacity = book.capacity, "Book resized");
        Ok(book)
    }

    fn lock_for(&self, isbn: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(isbn.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_backoff_ms;
        let exponential = base.saturating_mul(1u64 << (attempt - 1).min(6));
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..=base)
        } else {
            0
        };
        Duration::from_millis(exponential + jitter)
    }

    async fn apply<F>(
        &self,
        isbn: &str,
        user_id: Option<i32>,
        change: F,
    ) -> Result<Book, LedgerError>
    where
        F: Fn(&Book) -> Result<Book, LedgerError>,
    {
        let mut attempt = 1;
        loop {
            match self.try_apply(isbn, user_id, &change).await {
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(attempt, ?delay, error = %e, "Transient store failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!(attempt, error = %e, "Giving up after transient failures");
                    } else {
                        tracing::debug!(error = %e, "Ledger transition rejected");
                    }
                    return Err(e);
                }
                Ok(book) => return Ok(book),
            }
        }
    }

    async fn try_apply<F>(
        &self,
        isbn: &str,
        user_id: Option<i32>,
        change: &F,
    ) -> Result<Book, LedgerError>
    where
        F: Fn(&Book) -> Result<Book, LedgerError>,
    {
        // Resolve outside the lock so unknown isbns never get a lock entry
        if self.repository.books.get(isbn).await?.is_none() {
            return Err(LedgerError::ResourceNotFound(isbn.to_string()));
        }
        if let Some(user_id) = user_id {
            if !self.repository.users.exists(user_id).await? {
                return Err(LedgerError::SubjectNotFound(user_id));
            }
        }

        let lock = self.lock_for(isbn);
        let _guard = lock.lock().await;

        let current = self
            .repository
            .books
            .get(isbn)
            .await?
            .ok_or_else(|| LedgerError::ResourceNotFound(isbn.to_string()))?;
        let next = change(&current)?;

        self.repository
            .books
            .compare_and_swap(&next)
            .await
            .map_err(|e| match e {
                StoreError::Missing(isbn) => LedgerError::ResourceNotFound(isbn),
                other => LedgerError::Store(other),
            })
    }
}
