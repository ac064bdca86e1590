//! User directory REST API endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use userdir_core::models::{Comparer, SortField, SortOrder, User};
use userdir_core::{DirectoryError, UserId};
use userdir_service::{AddUserRequest, Filter, ListUsersRequest, Page, Sort, UpdateUserRequest};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// Request body for `POST /users`
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub country: String,
}

impl From<CreateUserRequest> for AddUserRequest {
    fn from(req: CreateUserRequest) -> Self {
        AddUserRequest {
            first_name: req.first_name,
            last_name: req.last_name,
            nickname: req.nickname,
            email: req.email,
            password: req.password,
            country: req.country,
        }
    }
}

/// Request body for `PATCH /users/{id}`; only provided fields are touched.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PatchUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub country: Option<String>,
}

impl From<PatchUserRequest> for UpdateUserRequest {
    fn from(req: PatchUserRequest) -> Self {
        UpdateUserRequest {
            first_name: req.first_name,
            last_name: req.last_name,
            nickname: req.nickname,
            email: req.email,
            password: req.password,
            country: req.country,
        }
    }
}

/// User response; mirrors `User` but gives utoipa a concrete schema for the id.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub country: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            first_name: user.first_name,
            last_name: user.last_name,
            nickname: user.nickname,
            email: user.email,
            country: user.country,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Query parameters for `GET /users`
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ListUsersQuery {
    /// Field to sort by: `first_name`, `last_name`, `nickname`, `email`, `country`
    pub sort_field: Option<String>,
    /// `asc` or `desc` (default `asc`)
    pub sort_order: Option<String>,
    /// Field to filter on, same vocabulary as `sort_field`
    pub filter_field: Option<String>,
    /// One of `gt`, `ge`, `lt`, `le`, `eq`
    pub filter_comparer: Option<String>,
    /// Literal value compared against `filter_field`
    pub filter_value: Option<String>,
    /// Page size; 0 selects the server default
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page's `next_cursor`
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub next_cursor: String,
}

fn parse_sort_field(raw: &str) -> Result<SortField, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown sort/filter field: {raw}")))
}

fn parse_sort_order(raw: &str) -> Result<SortOrder, ApiError> {
    match raw {
        "asc" => Ok(SortOrder::Ascending),
        "desc" => Ok(SortOrder::Descending),
        other => Err(ApiError::BadRequest(format!("Unknown sort order: {other}"))),
    }
}

fn parse_comparer(raw: &str) -> Result<Comparer, ApiError> {
    match raw {
        "gt" => Ok(Comparer::Gt),
        "ge" => Ok(Comparer::Ge),
        "lt" => Ok(Comparer::Lt),
        "le" => Ok(Comparer::Le),
        "eq" => Ok(Comparer::Eq),
        other => Err(ApiError::BadRequest(format!("Unknown comparer: {other}"))),
    }
}

fn parse_user_id(raw: &Uuid) -> UserId {
    UserId::from(*raw)
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Id or email already in use")
    ),
    tag = "users"
)]
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.service.add_user(req.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Remove a user by id
#[utoipa::path(
    delete,
    path = "/users/{id}",
    responses(
        (status = 200, description = "User removed", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    params(("id" = Uuid, Path, description = "User id")),
    tag = "users"
)]
async fn remove_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.service.remove_user(parse_user_id(&id)).await?;
    Ok(Json(user.into()))
}

/// Update a user's fields
#[utoipa::path(
    patch,
    path = "/users/{id}",
    request_body = PatchUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "User not found")
    ),
    params(("id" = Uuid, Path, description = "User id")),
    tag = "users"
)]
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .service
        .update_user(parse_user_id(&id), req.into())
        .await?;
    Ok(Json(user.into()))
}

/// List users with optional filter/sort/keyset pagination
#[utoipa::path(
    get,
    path = "/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = ListUsersResponse),
        (status = 400, description = "Invalid filter/sort/cursor")
    ),
    tag = "users"
)]
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let sort = match query.sort_field {
        Some(field) => Some(Sort {
            field: parse_sort_field(&field)?,
            order: match query.sort_order {
                Some(order) => parse_sort_order(&order)?,
                None => SortOrder::Ascending,
            },
        }),
        None => None,
    };

    let filter = match (query.filter_field, query.filter_comparer, query.filter_value) {
        (Some(field), Some(comparer), Some(value)) => Some(Filter {
            field: parse_sort_field(&field)?,
            comparer: parse_comparer(&comparer)?,
            value,
        }),
        (None, None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "filter_field, filter_comparer, and filter_value must be supplied together".into(),
            ));
        }
    };

    let result = state
        .service
        .list_users(ListUsersRequest {
            filter,
            sort,
            page: Page {
                limit: query.limit.unwrap_or(0),
                cursor: query.cursor.unwrap_or_default(),
            },
        })
        .await
        .map_err(|e| match e {
            DirectoryError::InvalidCursor => ApiError::BadRequest("Invalid cursor".to_string()),
            other => ApiError::from(other),
        })?;

    Ok(Json(ListUsersResponse {
        users: result.users.into_iter().map(UserResponse::from).collect(),
        next_cursor: result.next_cursor,
    }))
}

/// User routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(remove_user))
        .route("/users/{id}", patch(update_user))
}
