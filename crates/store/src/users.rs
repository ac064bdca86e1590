//! Users repository: CRUD over the `users` table
//!
//! Generic over `impl PgExecutor<'_>` so callers can run these inside the
//! same transaction as an outbox enqueue.

use sqlx::PgExecutor;
use userdir_core::models::User;
use userdir_core::{DirectoryError, DirectoryResult, UserId};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password_hash: String,
    pub email: String,
    pub country: String,
    pub salt: String,
}

/// Fields a caller may update; `None` means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub password_hash: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

pub async fn insert<'e, E>(exec: E, new_user: NewUser) -> DirectoryResult<User>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, first_name, last_name, nickname, password_hash, email, country, salt, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
        RETURNING id, first_name, last_name, nickname, password_hash, email, country, salt, created_at, updated_at
        "#,
    )
    .bind(new_user.id)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.nickname)
    .bind(new_user.password_hash)
    .bind(new_user.email)
    .bind(new_user.country)
    .bind(new_user.salt)
    .fetch_one(exec)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            DirectoryError::InvalidId(new_user_conflict_message())
        } else {
            DirectoryError::Store(e.to_string())
        }
    })
}

fn new_user_conflict_message() -> String {
    "user id or email already exists".to_string()
}

pub async fn find_by_id<'e, E>(exec: E, id: UserId) -> DirectoryResult<User>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"SELECT id, first_name, last_name, nickname, password_hash, email, country, salt, created_at, updated_at
           FROM users WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await
    .map_err(|e| DirectoryError::Store(e.to_string()))?
    .ok_or(DirectoryError::UserNotFound(id))
}

/// Find-one-and-delete: returns the deleted row, or `UserNotFound` if no
/// row matched.
pub async fn delete_by_id<'e, E>(exec: E, id: UserId) -> DirectoryResult<User>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"DELETE FROM users WHERE id = $1
           RETURNING id, first_name, last_name, nickname, password_hash, email, country, salt, created_at, updated_at"#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await
    .map_err(|e| DirectoryError::Store(e.to_string()))?
    .ok_or(DirectoryError::UserNotFound(id))
}

/// Find-one-and-update: applies only the fields present in `patch`.
pub async fn update<'e, E>(exec: E, id: UserId, patch: UserPatch) -> DirectoryResult<User>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            nickname = COALESCE($4, nickname),
            password_hash = COALESCE($5, password_hash),
            email = COALESCE($6, email),
            country = COALESCE($7, country),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, first_name, last_name, nickname, password_hash, email, country, salt, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(patch.first_name)
    .bind(patch.last_name)
    .bind(patch.nickname)
    .bind(patch.password_hash)
    .bind(patch.email)
    .bind(patch.country)
    .fetch_optional(exec)
    .await
    .map_err(|e| DirectoryError::Store(e.to_string()))?
    .ok_or(DirectoryError::UserNotFound(id))
}
