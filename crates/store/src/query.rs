//! Query planner: translates list-users requests into SQL and cursors
//!
//! Keyset pagination with the store's internal insertion id as a stable
//! secondary sort key. See SPEC_FULL.md §4.3 for the cursor format and
//! the keyset-predicate derivation this module implements.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use userdir_core::models::{Comparer, SortField, SortOrder, User};
use userdir_core::{DirectoryError, DirectoryResult};

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: SortField,
    pub comparer: Comparer,
    pub value: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub limit: i64,
    pub cursor: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListUsersRequest {
    pub filter: Option<Filter>,
    pub sort: Option<Sort>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct ListUsersResult {
    pub users: Vec<User>,
    pub next_cursor: String,
}

/// Row shape used internally to carry the insertion id needed to build
/// the next cursor; never surfaced outside the store crate.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    insertion_id: i64,
    id: userdir_core::UserId,
    first_name: String,
    last_name: String,
    nickname: String,
    password_hash: String,
    email: String,
    country: String,
    salt: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            nickname: self.nickname,
            password_hash: self.password_hash,
            email: self.email,
            country: self.country,
            salt: self.salt,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn sort_value(&self, field: SortField) -> &str {
        match field {
            SortField::FirstName => &self.first_name,
            SortField::LastName => &self.last_name,
            SortField::Nickname => &self.nickname,
            SortField::Email => &self.email,
            SortField::Country => &self.country,
        }
    }
}

/// `effective_limit = limit if 0<limit<=MAX else (DEFAULT if limit==0 else MAX)`.
pub fn effective_limit(requested: i64, default: i64, max: i64) -> i64 {
    if requested == 0 {
        default
    } else if requested > 0 && requested <= max {
        requested
    } else {
        max
    }
}

fn encode_cursor(insertion_id: i64, last_value: &str) -> String {
    format!("{insertion_id:x}:{last_value}")
}

fn decode_cursor(cursor: &str) -> DirectoryResult<(i64, String)> {
    let mut parts = cursor.splitn(2, ':');
    let id_hex = parts.next().ok_or(DirectoryError::InvalidCursor)?;
    let value = parts.next().ok_or(DirectoryError::InvalidCursor)?;
    let insertion_id = i64::from_str_radix(id_hex, 16).map_err(|_| DirectoryError::InvalidCursor)?;
    Ok((insertion_id, value.to_string()))
}

pub async fn list_users<'e, E>(
    exec: E,
    request: &ListUsersRequest,
    default_limit: i64,
    max_limit: i64,
) -> DirectoryResult<ListUsersResult>
where
    E: PgExecutor<'e>,
{
    let limit = effective_limit(request.page.limit, default_limit, max_limit);

    let cursor = if request.page.cursor.is_empty() {
        None
    } else {
        Some(decode_cursor(&request.page.cursor)?)
    };

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT insertion_id, id, first_name, last_name, nickname, password_hash, email, country, salt, created_at, updated_at FROM users WHERE 1=1",
    );

    if let Some(filter) = &request.filter {
        qb.push(" AND ");
        qb.push(filter.field.column());
        qb.push(" ");
        qb.push(filter.comparer.sql_operator());
        qb.push(" ");
        qb.push_bind(filter.value.clone());
    }

    if let Some((last_id, last_value)) = &cursor {
        match &request.sort {
            Some(sort) => {
                let op = match sort.order {
                    SortOrder::Ascending => ">",
                    SortOrder::Descending => "<",
                };
                qb.push(" AND (");
                qb.push(sort.field.column());
                qb.push(format!(" {op} "));
                qb.push_bind(last_value.clone());
                qb.push(" OR (");
                qb.push(sort.field.column());
                qb.push(" = ");
                qb.push_bind(last_value.clone());
                qb.push(format!(" AND insertion_id {op} "));
                qb.push_bind(*last_id);
                qb.push("))");
            }
            None => {
                qb.push(" AND insertion_id > ");
                qb.push_bind(*last_id);
            }
        }
    }

    match &request.sort {
        Some(sort) => {
            let dir = match sort.order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            qb.push(" ORDER BY ");
            qb.push(sort.field.column());
            qb.push(format!(" {dir}, insertion_id {dir}"));
        }
        None => {
            qb.push(" ORDER BY insertion_id ASC");
        }
    }

    qb.push(" LIMIT ");
    qb.push_bind(limit);

    let rows: Vec<UserRow> = qb
        .build_query_as()
        .fetch_all(exec)
        .await
        .map_err(|e| DirectoryError::Store(e.to_string()))?;

    let next_cursor = match rows.last() {
        Some(last) => match &request.sort {
            Some(sort) => encode_cursor(last.insertion_id, last.sort_value(sort.field)),
            None => encode_cursor(last.insertion_id, ""),
        },
        None => String::new(),
    };

    Ok(ListUsersResult {
        users: rows.into_iter().map(UserRow::into_user).collect(),
        next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_limit_uses_default_when_zero() {
        assert_eq!(effective_limit(0, 20, 100), 20);
    }

    #[test]
    fn effective_limit_passes_through_in_range() {
        assert_eq!(effective_limit(5, 20, 100), 5);
    }

    #[test]
    fn effective_limit_clamps_out_of_range_to_max() {
        assert_eq!(effective_limit(500, 20, 100), 100);
        assert_eq!(effective_limit(-1, 20, 100), 100);
    }

    #[test]
    fn cursor_roundtrips() {
        let cursor = encode_cursor(42, "Jacob");
        let (id, value) = decode_cursor(&cursor).unwrap();
        assert_eq!(id, 42);
        assert_eq!(value, "Jacob");
    }

    #[test]
    fn cursor_with_empty_value_still_has_separator() {
        let cursor = encode_cursor(7, "");
        assert_eq!(cursor, "7:");
        let (id, value) = decode_cursor(&cursor).unwrap();
        assert_eq!(id, 7);
        assert_eq!(value, "");
    }

    #[test]
    fn cursor_missing_separator_is_rejected() {
        assert!(matches!(decode_cursor("notahexvalue"), Err(DirectoryError::InvalidCursor)));
    }

    #[test]
    fn cursor_bad_hex_is_rejected() {
        assert!(matches!(decode_cursor("zz:value"), Err(DirectoryError::InvalidCursor)));
    }
}
