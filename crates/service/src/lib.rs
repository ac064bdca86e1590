//! User Service: validated mutations, each transactionally paired with
//! an outbox enqueue.
//!
//! Grounded on teacher's handler-level validate-then-mutate-then-commit
//! idiom (`crates/api/src/routes/*`), generalized into a standalone
//! service object the API layer calls into rather than embedding the
//! transaction logic directly in HTTP handlers.

use userdir_core::models::{Envelope, OutboxState, SortField, SortOrder, User, UserAdded, UserRemoved, Comparer};
use userdir_core::{config::CoreConfig, security, validation, DirectoryError, DirectoryResult, MessageId, UserId};
use userdir_store::backoff::BackoffPolicy;
use userdir_store::query::{self, ListUsersResult};
use userdir_store::users::{self, NewUser, UserPatch};
use userdir_store::{outbox, Store};

pub use userdir_store::query::{Filter, ListUsersRequest, Page, Sort};

#[derive(Debug, Clone)]
pub struct AddUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub country: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub country: Option<String>,
}

pub struct UserService {
    store: Store,
    config: CoreConfig,
}

impl UserService {
    pub fn new(store: Store, config: CoreConfig) -> Self {
        Self { store, config }
    }

    fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.config.outbox_base_retry_secs, self.config.outbox_max_retry_secs)
    }

    pub async fn add_user(&self, req: AddUserRequest) -> DirectoryResult<User> {
        validate_non_empty("first_name", &req.first_name)?;
        validate_non_empty("last_name", &req.last_name)?;
        validate_non_empty("nickname", &req.nickname)?;
        validate_non_empty("password", &req.password)?;
        if !validation::is_valid_email(&req.email) {
            return Err(DirectoryError::InvalidEmail(req.email));
        }
        if !validation::is_valid_country(&req.country) {
            return Err(DirectoryError::InvalidCountry(req.country));
        }

        let id = UserId::new();
        let salt = security::generate_salt();
        let password_hash = security::hash_password(&req.password, &salt);

        let mut tx = self.store.begin().await.map_err(store_err)?;

        let user = users::insert(
            &mut *tx,
            NewUser {
                id,
                first_name: req.first_name,
                last_name: req.last_name,
                nickname: req.nickname,
                password_hash,
                email: req.email,
                country: req.country,
                salt,
            },
        )
        .await?;

        let event = UserAdded {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            country: user.country.clone(),
        };
        let envelope = Envelope {
            id: MessageId::new(),
            topic: self.config.topic_user_added.clone(),
            key: user.id.to_string().into_bytes(),
            value: serde_json::to_vec(&event).map_err(|e| DirectoryError::Store(e.to_string()))?,
        };
        outbox::enqueue(&mut *tx, &envelope, self.config.initial_retry_delay_secs).await?;

        tx.commit().await.map_err(store_err)?;

        Ok(user)
    }

    pub async fn remove_user(&self, id: UserId) -> DirectoryResult<User> {
        let mut tx = self.store.begin().await.map_err(store_err)?;

        let user = users::delete_by_id(&mut *tx, id).await?;

        let event = UserRemoved { id: user.id };
        let envelope = Envelope {
            id: MessageId::new(),
            topic: self.config.topic_user_removed.clone(),
            key: user.id.to_string().into_bytes(),
            value: serde_json::to_vec(&event).map_err(|e| DirectoryError::Store(e.to_string()))?,
        };
        outbox::enqueue(&mut *tx, &envelope, self.config.initial_retry_delay_secs).await?;

        tx.commit().await.map_err(store_err)?;

        Ok(user)
    }

    pub async fn update_user(&self, id: UserId, req: UpdateUserRequest) -> DirectoryResult<User> {
        if let Some(email) = &req.email {
            if !validation::is_valid_email(email) {
                return Err(DirectoryError::InvalidEmail(email.clone()));
            }
        }
        if let Some(country) = &req.country {
            if !validation::is_valid_country(country) {
                return Err(DirectoryError::InvalidCountry(country.clone()));
            }
        }

        let mut tx = self.store.begin().await.map_err(store_err)?;

        // Re-hash against the existing salt; salt itself is never rotated.
        let password_hash = match &req.password {
            Some(password) => {
                let existing = users::find_by_id(&mut *tx, id).await?;
                Some(security::hash_password(password, &existing.salt))
            }
            None => None,
        };

        let patch = UserPatch {
            first_name: req.first_name,
            last_name: req.last_name,
            nickname: req.nickname,
            password_hash,
            email: req.email,
            country: req.country,
        };

        let user = users::update(&mut *tx, id, patch).await?;

        tx.commit().await.map_err(store_err)?;

        Ok(user)
    }

    pub async fn list_users(&self, req: ListUsersRequest) -> DirectoryResult<ListUsersResult> {
        query::list_users(
            self.store.pool(),
            &req,
            self.config.list_user_default_limit,
            self.config.list_user_max_limit,
        )
        .await
    }
}

fn validate_non_empty(field: &'static str, value: &str) -> DirectoryResult<()> {
    if value.trim().is_empty() {
        return Err(DirectoryError::MissingField(field));
    }
    Ok(())
}

fn store_err(e: sqlx::Error) -> DirectoryError {
    DirectoryError::Store(e.to_string())
}
