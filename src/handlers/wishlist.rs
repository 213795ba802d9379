//! Wishlist API Handlers
//! /api/users/:id/wishlist

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;
use tracing::info;

use super::products::fetch_product;
use super::users::fetch_user;
use super::{db_error, not_found, now_ms, ok, ApiResult};
use crate::models::{AddWishlistRequest, IdResponse, Product, WishlistEntry};
use crate::AppState;

/// 商品行 + 追加日時（JOIN 1回で取る）
#[derive(sqlx::FromRow)]
struct WishlistRow {
    #[sqlx(flatten)]
    product: Product,
    added_at_ms: i64,
}

/// GET /api/users/:id/wishlist - お気に入り一覧（追加が新しい順）
///
/// 削除済みの商品は含めない。
pub async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<WishlistEntry>> {
    fetch_user(&state, &user_id).await?;

    let rows: Vec<WishlistRow> = sqlx::query_as(r#"
        SELECT p.*, w.added_at_ms FROM wishlist w
        JOIN products p ON p.id = w.product_id
        WHERE w.user_id = ? AND p.is_alive = 1
        ORDER BY w.added_at_ms DESC, w.product_id ASC
    "#)
    .bind(&user_id)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let entries = rows
        .iter()
        .map(|row| WishlistEntry {
            product: row.product.to_catalog_item(),
            added_at_ms: row.added_at_ms,
        })
        .collect();

    ok(entries)
}

/// POST /api/users/:id/wishlist - お気に入り追加（追加済みなら何もしない）
pub async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<AddWishlistRequest>,
) -> ApiResult<IdResponse> {
    fetch_user(&state, &user_id).await?;
    let product = fetch_product(&state, &req.product_id).await?;

    let result = sqlx::query(
        "INSERT OR IGNORE INTO wishlist (user_id, product_id, added_at_ms) VALUES (?, ?, ?)"
    )
    .bind(&user_id)
    .bind(&product.id)
    .bind(now_ms())
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() > 0 {
        info!("Wishlist add: user={}, product={}", user_id, product.id);
    }

    ok(IdResponse { id: product.id })
}

/// DELETE /api/users/:id/wishlist/:product_id - お気に入り削除
pub async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> ApiResult<IdResponse> {
    let result = sqlx::query("DELETE FROM wishlist WHERE user_id = ? AND product_id = ?")
        .bind(&user_id)
        .bind(&product_id)
        .execute(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Wishlist entry"));
    }

    info!("Wishlist remove: user={}, product={}", user_id, product_id);
    ok(IdResponse { id: product_id })
}
