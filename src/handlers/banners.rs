//! Banners API Handlers
//! /api/banners エンドポイント（トップページのコンテンツ管理）

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{db_error, new_id, not_found, now_ms, ok, require, ApiResult, HandlerError};
use crate::models::{Banner, BannerResponse, CreateBannerRequest, IdResponse, UpdateBannerRequest};
use crate::AppState;

// ========================================
// Query Parameters
// ========================================

#[derive(Debug, Deserialize)]
pub struct ListBannersQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

// ========================================
// Handlers
// ========================================

/// GET /api/banners - バナー一覧（表示順）
pub async fn list_banners(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBannersQuery>,
) -> ApiResult<Vec<BannerResponse>> {
    let banners: Vec<Banner> = if query.include_inactive {
        sqlx::query_as("SELECT * FROM banners ORDER BY position ASC, created_at_ms ASC")
            .fetch_all(&state.db)
            .await
    } else {
        sqlx::query_as(
            "SELECT * FROM banners WHERE is_active = 1 ORDER BY position ASC, created_at_ms ASC"
        )
        .fetch_all(&state.db)
        .await
    }
    .map_err(db_error)?;

    ok(banners.iter().map(BannerResponse::from).collect())
}

/// POST /api/banners - バナー作成
pub async fn create_banner(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBannerRequest>,
) -> ApiResult<BannerResponse> {
    require("title", &req.title)?;
    require("image_url", &req.image_url)?;

    let id = new_id();
    let now_ms = now_ms();

    sqlx::query(r#"
        INSERT INTO banners (id, title, subtitle, image_url, link_url, position, is_active, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#)
    .bind(&id)
    .bind(&req.title)
    .bind(&req.subtitle)
    .bind(&req.image_url)
    .bind(&req.link_url)
    .bind(req.position)
    .bind(req.is_active as i32)
    .bind(now_ms)
    .bind(now_ms)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    info!("Banner created: id={}", id);

    let banner = fetch_banner(&state, &id).await?;
    ok(BannerResponse::from(&banner))
}

/// PUT /api/banners/:id - バナー更新
pub async fn update_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBannerRequest>,
) -> ApiResult<BannerResponse> {
    if let Some(title) = &req.title {
        require("title", title)?;
    }
    if let Some(image_url) = &req.image_url {
        require("image_url", image_url)?;
    }

    let result = sqlx::query(r#"
        UPDATE banners SET
            title = COALESCE(?, title),
            subtitle = COALESCE(?, subtitle),
            image_url = COALESCE(?, image_url),
            link_url = COALESCE(?, link_url),
            position = COALESCE(?, position),
            is_active = COALESCE(?, is_active),
            updated_at_ms = ?
        WHERE id = ?
    "#)
    .bind(&req.title)
    .bind(&req.subtitle)
    .bind(&req.image_url)
    .bind(&req.link_url)
    .bind(req.position)
    .bind(req.is_active.map(i32::from))
    .bind(now_ms())
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Banner"));
    }

    info!("Banner updated: id={}", id);

    let banner = fetch_banner(&state, &id).await?;
    ok(BannerResponse::from(&banner))
}

/// DELETE /api/banners/:id - バナー削除
pub async fn delete_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<IdResponse> {
    let result = sqlx::query("DELETE FROM banners WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Banner"));
    }

    info!("Banner deleted: id={}", id);
    ok(IdResponse { id })
}

async fn fetch_banner(state: &AppState, id: &str) -> Result<Banner, HandlerError> {
    sqlx::query_as("SELECT * FROM banners WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Banner"))
}
