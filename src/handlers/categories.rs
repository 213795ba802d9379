//! Categories API Handlers
//! /api/categories エンドポイント

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::info;

use super::{
    catalog_error, db_error, error_response, not_found, now_ms, ok, require, ApiResult,
    CatalogQuery, HandlerError,
};
use crate::catalog::{run_pipeline, CatalogItem, CatalogVariant};
use crate::models::{
    ApiEnvelope, Category, CategoryResponse, CreateCategoryRequest, IdResponse, Pagination,
    Product, UpdateCategoryRequest,
};
use crate::AppState;

// ========================================
// Handlers
// ========================================

/// GET /api/categories - カテゴリ一覧（表示順）
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<CategoryResponse>> {
    let rows: Vec<(String, String, Option<String>, Option<String>, i64, i64)> = sqlx::query_as(r#"
        SELECT c.slug, c.name, c.description, c.image_url, c.position,
               (SELECT COUNT(*) FROM products p WHERE p.category_slug = c.slug AND p.is_alive = 1)
        FROM categories c
        ORDER BY c.position ASC, c.name ASC
    "#)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let categories = rows
        .into_iter()
        .map(|(slug, name, description, image_url, position, product_count)| CategoryResponse {
            slug,
            name,
            description,
            image_url,
            position,
            product_count,
        })
        .collect();

    ok(categories)
}

/// GET /api/categories/:slug - カテゴリ詳細
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<CategoryResponse> {
    let category = fetch_category(&state, &slug).await?;

    let (product_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE category_slug = ? AND is_alive = 1"
    )
    .bind(&slug)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    ok(CategoryResponse {
        slug: category.slug,
        name: category.name,
        description: category.description,
        image_url: category.image_url,
        position: category.position,
        product_count,
    })
}

/// GET /api/categories/:slug/products - カテゴリ別商品一覧
///
/// 絞り込み・並び替え・ページ分割はサーバー側で行う。
/// 価格帯は `currency` で換算した後の金額として扱う。
pub async fn list_category_products(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Vec<CatalogItem>> {
    fetch_category(&state, &slug).await?;

    let filters = query.filters().map_err(catalog_error)?;
    let sort = query.sort_key().map_err(catalog_error)?;
    let currency = query.currency().map_err(catalog_error)?;
    let page_state = query.page_state(state.config.items_per_page);

    // 新しい順で取得（Dynamic の Newest はこの順序を保つ）
    let products: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE category_slug = ? AND is_alive = 1 ORDER BY created_at_ms DESC, id ASC"
    )
    .bind(&slug)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let items: Vec<CatalogItem> = products
        .iter()
        .map(|p| currency.convert_item(&p.to_catalog_item()))
        .collect();

    let page = run_pipeline(&items, &filters, sort, &page_state, CatalogVariant::Dynamic);
    let pagination = Pagination::from(&page);

    Ok(Json(ApiEnvelope::paged(page.items, pagination)))
}

/// POST /api/categories - カテゴリ作成
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<CategoryResponse> {
    require("slug", &req.slug)?;
    require("name", &req.name)?;

    if !is_valid_slug(&req.slug) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid slug: {} (use lowercase letters, digits and '-')", req.slug),
        ));
    }

    let now_ms = now_ms();
    let result = sqlx::query(r#"
        INSERT INTO categories (slug, name, description, image_url, position, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO NOTHING
    "#)
    .bind(&req.slug)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.image_url)
    .bind(req.position)
    .bind(now_ms)
    .bind(now_ms)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Category already exists: {}", req.slug),
        ));
    }

    info!("Category created: slug={}", req.slug);

    ok(CategoryResponse {
        slug: req.slug,
        name: req.name,
        description: req.description,
        image_url: req.image_url,
        position: req.position,
        product_count: 0,
    })
}

/// PUT /api/categories/:slug - カテゴリ更新
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<IdResponse> {
    if let Some(name) = &req.name {
        require("name", name)?;
    }

    let result = sqlx::query(r#"
        UPDATE categories SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            image_url = COALESCE(?, image_url),
            position = COALESCE(?, position),
            updated_at_ms = ?
        WHERE slug = ?
    "#)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.image_url)
    .bind(req.position)
    .bind(now_ms())
    .bind(&slug)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Category"));
    }

    info!("Category updated: slug={}", slug);
    ok(IdResponse { id: slug })
}

/// DELETE /api/categories/:slug - カテゴリ削除（商品が残っている場合は不可）
///
/// 論理削除済みの商品は外部キーを塞ぐので、同じトランザクションで物理削除する。
/// 注文明細は商品名と価格を複製して持つため影響しない。
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<IdResponse> {
    let mut tx = state.db.begin().await.map_err(db_error)?;

    let (in_use,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE category_slug = ? AND is_alive = 1"
    )
    .bind(&slug)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error)?;

    if in_use > 0 {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Category {} still has {} products", slug, in_use),
        ));
    }

    sqlx::query(
        "DELETE FROM wishlist WHERE product_id IN (SELECT id FROM products WHERE category_slug = ? AND is_alive = 0)"
    )
    .bind(&slug)
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    let purged = sqlx::query("DELETE FROM products WHERE category_slug = ? AND is_alive = 0")
        .bind(&slug)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

    let result = sqlx::query("DELETE FROM categories WHERE slug = ?")
        .bind(&slug)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Category"));
    }

    tx.commit().await.map_err(db_error)?;

    info!("Category deleted: slug={}, purged_products={}", slug, purged);
    ok(IdResponse { id: slug })
}

// ========================================
// Helper Functions
// ========================================

pub(crate) async fn fetch_category(state: &AppState, slug: &str) -> Result<Category, HandlerError> {
    sqlx::query_as("SELECT * FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Category"))
}

/// URL に使える slug か（小文字英数字とハイフン）
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("home-kitchen"));
        assert!(is_valid_slug("books2"));
        assert!(!is_valid_slug("Home Kitchen"));
        assert!(!is_valid_slug("-books"));
        assert!(!is_valid_slug(""));
    }
}
