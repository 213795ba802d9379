//! Users API Handlers
//! /api/users エンドポイント

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{
    db_error, error_response, new_id, not_found, now_ms, ok, page_state, require, ApiResult,
    HandlerError,
};
use crate::catalog::paginate;
use crate::models::{
    user_role, user_status, ApiEnvelope, CreateUserRequest, IdResponse, Pagination,
    UpdateUserRequest, User, UserResponse,
};
use crate::AppState;

// ========================================
// Query Parameters
// ========================================

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub role: Option<i32>,
    pub status: Option<i32>,
}

// ========================================
// Handlers
// ========================================

/// GET /api/users - ユーザー一覧（管理画面）
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Vec<UserResponse>> {
    let users: Vec<User> = sqlx::query_as(
        "SELECT * FROM users WHERE is_alive = 1 ORDER BY created_at_ms DESC, id ASC"
    )
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let responses: Vec<UserResponse> = users
        .iter()
        .filter(|u| query.role.map_or(true, |r| u.role == r))
        .filter(|u| query.status.map_or(true, |s| u.status == s))
        .filter(|u| {
            search.as_deref().map_or(true, |term| {
                u.name.to_lowercase().contains(term) || u.email.contains(term)
            })
        })
        .map(UserResponse::from)
        .collect();

    let page = paginate(
        &responses,
        &page_state(query.page, query.limit, state.config.items_per_page),
    );
    let pagination = Pagination::from(&page);

    Ok(Json(ApiEnvelope::paged(page.items, pagination)))
}

/// GET /api/users/:id - ユーザー詳細
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<UserResponse> {
    let user = fetch_user(&state, &id).await?;
    ok(UserResponse::from(&user))
}

/// POST /api/users - ユーザー登録
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    require("name", &req.name)?;
    let email = normalize_email(&req.email)?;

    if !user_role::is_valid(req.role) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid role: {}", req.role),
        ));
    }

    // 重複チェック
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?;

    if existing.is_some() {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Email already registered: {}", email),
        ));
    }

    let id = new_id();
    let now_ms = now_ms();

    sqlx::query(r#"
        INSERT INTO users (id, name, email, phone, role, status, created_at_ms, updated_at_ms, is_alive)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
    "#)
    .bind(&id)
    .bind(req.name.trim())
    .bind(&email)
    .bind(&req.phone)
    .bind(req.role)
    .bind(user_status::ACTIVE)
    .bind(now_ms)
    .bind(now_ms)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    info!("User created: id={}", id);

    let user = fetch_user(&state, &id).await?;
    ok(UserResponse::from(&user))
}

/// PUT /api/users/:id - ユーザー更新
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    if let Some(name) = &req.name {
        require("name", name)?;
    }
    if let Some(role) = req.role.filter(|r| !user_role::is_valid(*r)) {
        return Err(error_response(StatusCode::BAD_REQUEST, format!("Invalid role: {}", role)));
    }
    if let Some(status) = req.status.filter(|s| !user_status::is_valid(*s)) {
        return Err(error_response(StatusCode::BAD_REQUEST, format!("Invalid status: {}", status)));
    }

    let result = sqlx::query(r#"
        UPDATE users SET
            name = COALESCE(?, name),
            phone = COALESCE(?, phone),
            role = COALESCE(?, role),
            status = COALESCE(?, status),
            updated_at_ms = ?
        WHERE id = ? AND is_alive = 1
    "#)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.phone)
    .bind(req.role)
    .bind(req.status)
    .bind(now_ms())
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("User"));
    }

    info!("User updated: id={}", id);

    let user = fetch_user(&state, &id).await?;
    ok(UserResponse::from(&user))
}

/// DELETE /api/users/:id - ユーザー削除（論理削除）
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<IdResponse> {
    let result = sqlx::query(
        "UPDATE users SET is_alive = 0, updated_at_ms = ? WHERE id = ? AND is_alive = 1"
    )
    .bind(now_ms())
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("User"));
    }

    info!("User deleted: id={}", id);
    ok(IdResponse { id })
}

// ========================================
// Helper Functions
// ========================================

pub(crate) async fn fetch_user(state: &AppState, id: &str) -> Result<User, HandlerError> {
    sqlx::query_as("SELECT * FROM users WHERE id = ? AND is_alive = 1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User"))
}

/// メールアドレスの簡易検証（小文字化して返す）
fn normalize_email(raw: &str) -> Result<String, HandlerError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid email: {}", raw),
        ));
    }
    Ok(email)
}
