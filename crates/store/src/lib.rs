//! Postgres-backed store for the user directory
//!
//! Wraps a connection pool and exposes typed repositories over the
//! `users` and `outbox` tables. Callers that need atomicity across both
//! tables open a transaction with [`Store::begin`] and pass the same
//! `&mut Transaction` to both repositories; sqlx rolls the transaction
//! back automatically if it is dropped without a `commit`.

pub mod backoff;
pub mod outbox;
pub mod query;
pub mod users;

use sqlx::{PgPool, Postgres, Transaction};

/// Thin wrapper around a `PgPool`.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a transaction spanning both the `users` and `outbox` tables.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
