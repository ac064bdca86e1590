//! Core domain models for the user directory
//!
//! These models represent the core business entities and map to database rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, UserId};

/// A persistent user record.
///
/// Plaintext passwords never persist; `password_hash` is a digest of
/// `plaintext || salt`, with `salt` stored alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub country: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outbox message state.
///
/// `Finished` is terminal; a row transitions monotonically through
/// `Waiting -> Processing -> (Waiting | Finished)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_state", rename_all = "lowercase")]
pub enum OutboxState {
    Waiting,
    Processing,
    Finished,
}

/// A persistent outbox row, written transactionally alongside the user
/// mutation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxMessage {
    pub msg_id: MessageId,
    #[sqlx(json)]
    pub data: serde_json::Value,
    pub next_retry: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub retries: i32,
    pub state: OutboxState,
}

/// In-memory view of an outbox payload, reconstructed from `OutboxMessage.data`.
///
/// Invariant: `id` equals the owning outbox row's `msg_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    pub topic: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Event published when a user is added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAdded {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub country: String,
}

/// Event published when a user is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRemoved {
    pub id: UserId,
}

/// Fields eligible for sorting and filtering in `listUsers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    FirstName,
    LastName,
    Nickname,
    Email,
    Country,
}

impl SortField {
    /// The backing column name, used to build SQL identifiers.
    pub fn column(self) -> &'static str {
        match self {
            SortField::FirstName => "first_name",
            SortField::LastName => "last_name",
            SortField::Nickname => "nickname",
            SortField::Email => "email",
            SortField::Country => "country",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_name" => Ok(SortField::FirstName),
            "last_name" => Ok(SortField::LastName),
            "nickname" => Ok(SortField::Nickname),
            "email" => Ok(SortField::Email),
            "country" => Ok(SortField::Country),
            _ => Err(()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Comparer for a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparer {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Comparer {
    pub fn sql_operator(self) -> &'static str {
        match self {
            Comparer::Gt => ">",
            Comparer::Ge => ">=",
            Comparer::Lt => "<",
            Comparer::Le => "<=",
            Comparer::Eq => "=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sort_field_round_trips_through_column_name() {
        for field in [
            SortField::FirstName,
            SortField::LastName,
            SortField::Nickname,
            SortField::Email,
            SortField::Country,
        ] {
            assert_eq!(SortField::from_str(field.column()), Ok(field));
        }
    }

    #[test]
    fn user_serialization_omits_password_and_salt() {
        let user = User {
            id: UserId::new(),
            first_name: "Jessica".into(),
            last_name: "Testerson".into(),
            nickname: "jT1".into(),
            password_hash: "deadbeef".into(),
            email: "jess@example.com".into(),
            country: "DK".into(),
            salt: "saltsaltsalt".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("saltsaltsalt"));
        assert!(json.contains("Jessica"));
    }
}
