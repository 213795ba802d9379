//! Addresses API Handlers
//! /api/users/:id/addresses, /api/addresses/:id

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;
use tracing::info;

use super::users::fetch_user;
use super::{db_error, new_id, not_found, now_ms, ok, require, ApiResult, HandlerError};
use crate::models::{
    Address, AddressResponse, CreateAddressRequest, IdResponse, UpdateAddressRequest,
};
use crate::AppState;

/// GET /api/users/:id/addresses - 住所一覧（既定の住所が先頭）
pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<AddressResponse>> {
    fetch_user(&state, &user_id).await?;

    let addresses: Vec<Address> = sqlx::query_as(
        "SELECT * FROM addresses WHERE user_id = ? ORDER BY is_default DESC, created_at_ms ASC, id ASC"
    )
    .bind(&user_id)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    ok(addresses.iter().map(AddressResponse::from).collect())
}

/// POST /api/users/:id/addresses - 住所追加
///
/// 最初の住所は自動的に既定になる。
pub async fn create_address(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateAddressRequest>,
) -> ApiResult<AddressResponse> {
    fetch_user(&state, &user_id).await?;

    require("full_name", &req.full_name)?;
    require("line1", &req.line1)?;
    require("city", &req.city)?;
    require("postal_code", &req.postal_code)?;
    require("country", &req.country)?;

    let id = new_id();
    let mut tx = state.db.begin().await.map_err(db_error)?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM addresses WHERE user_id = ?")
        .bind(&user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

    let is_default = req.is_default || existing == 0;
    if is_default {
        sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ?")
            .bind(&user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
    }

    sqlx::query(r#"
        INSERT INTO addresses (
            id, user_id, full_name, line1, line2, city, state, postal_code,
            country, phone, is_default, created_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#)
    .bind(&id)
    .bind(&user_id)
    .bind(req.full_name.trim())
    .bind(req.line1.trim())
    .bind(&req.line2)
    .bind(req.city.trim())
    .bind(&req.state)
    .bind(req.postal_code.trim())
    .bind(req.country.trim())
    .bind(&req.phone)
    .bind(is_default as i32)
    .bind(now_ms())
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    info!("Address created: id={}, user={}, default={}", id, user_id, is_default);

    let address = fetch_address(&state, &id).await?;
    ok(AddressResponse::from(&address))
}

/// PUT /api/addresses/:id - 住所更新
///
/// `is_default: false` は無視する（既定の解除は別の住所を既定にすることで行う）。
pub async fn update_address(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAddressRequest>,
) -> ApiResult<AddressResponse> {
    let existing = fetch_address(&state, &id).await?;

    for (field, value) in [
        ("full_name", &req.full_name),
        ("line1", &req.line1),
        ("city", &req.city),
        ("postal_code", &req.postal_code),
        ("country", &req.country),
    ] {
        if let Some(value) = value {
            require(field, value)?;
        }
    }

    let mut tx = state.db.begin().await.map_err(db_error)?;

    if req.is_default == Some(true) {
        sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ?")
            .bind(&existing.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query("UPDATE addresses SET is_default = 1 WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
    }

    sqlx::query(r#"
        UPDATE addresses SET
            full_name = COALESCE(?, full_name),
            line1 = COALESCE(?, line1),
            line2 = COALESCE(?, line2),
            city = COALESCE(?, city),
            state = COALESCE(?, state),
            postal_code = COALESCE(?, postal_code),
            country = COALESCE(?, country),
            phone = COALESCE(?, phone)
        WHERE id = ?
    "#)
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(req.line1.as_deref().map(str::trim))
    .bind(&req.line2)
    .bind(req.city.as_deref().map(str::trim))
    .bind(&req.state)
    .bind(req.postal_code.as_deref().map(str::trim))
    .bind(req.country.as_deref().map(str::trim))
    .bind(&req.phone)
    .bind(&id)
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    info!("Address updated: id={}", id);

    let address = fetch_address(&state, &id).await?;
    ok(AddressResponse::from(&address))
}

/// DELETE /api/addresses/:id - 住所削除
///
/// 既定の住所を消した場合は最も古い住所を既定に繰り上げる。
pub async fn delete_address(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<IdResponse> {
    let address = fetch_address(&state, &id).await?;
    let mut tx = state.db.begin().await.map_err(db_error)?;

    sqlx::query("DELETE FROM addresses WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    if address.is_default == 1 {
        sqlx::query(r#"
            UPDATE addresses SET is_default = 1
            WHERE id = (
                SELECT id FROM addresses WHERE user_id = ?
                ORDER BY created_at_ms ASC, id ASC LIMIT 1
            )
        "#)
        .bind(&address.user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
    }

    tx.commit().await.map_err(db_error)?;

    info!("Address deleted: id={}, user={}", id, address.user_id);
    ok(IdResponse { id })
}

async fn fetch_address(state: &AppState, id: &str) -> Result<Address, HandlerError> {
    sqlx::query_as("SELECT * FROM addresses WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Address"))
}
