//! Products API Handlers
//! /api/products エンドポイント

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::categories::fetch_category;
use super::{
    catalog_error, db_error, error_response, new_id, not_found, now_ms, ok, require, ApiResult,
    CatalogQuery, HandlerError,
};
use crate::catalog::filter::MAX_RATING;
use crate::catalog::{run_pipeline, CatalogItem, CatalogVariant};
use crate::models::{
    ApiEnvelope, CreateProductRequest, IdResponse, Pagination, Product, ProductResponse,
    UpdateProductRequest,
};
use crate::AppState;

// ========================================
// Handlers
// ========================================

/// GET /api/products - 商品一覧（管理画面）
///
/// `search` はタイトルとブランドの部分一致（大文字小文字を区別しない）。
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Vec<ProductResponse>> {
    let filters = query.filters().map_err(catalog_error)?;
    let sort = query.sort_key().map_err(catalog_error)?;
    let page_state = query.page_state(state.config.items_per_page);
    let search = query.search_term();

    let products: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE is_alive = 1 ORDER BY created_at_ms DESC, id ASC"
    )
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let items: Vec<CatalogItem> = products
        .iter()
        .filter(|p| search.as_deref().map_or(true, |term| matches_search(p, term)))
        .map(Product::to_catalog_item)
        .collect();

    let page = run_pipeline(&items, &filters, sort, &page_state, CatalogVariant::Dynamic);
    let pagination = Pagination::from(&page);

    // パイプラインの結果を管理画面用の詳細レスポンスに戻す
    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();
    let responses = page
        .items
        .iter()
        .filter_map(|item| by_id.get(item.id.as_str()))
        .map(|p| ProductResponse::from(*p))
        .collect();

    Ok(Json(ApiEnvelope::paged(responses, pagination)))
}

/// GET /api/products/:id - 商品詳細
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ProductResponse> {
    let product = fetch_product(&state, &id).await?;
    ok(ProductResponse::from(&product))
}

/// POST /api/products - 商品作成
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<ProductResponse> {
    require("title", &req.title)?;
    validate_pricing(req.price, req.original_price)?;
    validate_rating(req.rating)?;
    if req.stock < 0 || req.review_count < 0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "stock and review_count must not be negative".to_string(),
        ));
    }

    // Category存在チェック
    fetch_category(&state, &req.category_slug).await.map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Category not found: {}", req.category_slug),
        )
    })?;

    let id = new_id();
    let now_ms = now_ms();

    sqlx::query(r#"
        INSERT INTO products (
            id, title, description, price, original_price, rating, review_count,
            brand, category_slug, image_url, stock, is_prime, is_delivery_tomorrow,
            is_featured, created_at_ms, updated_at_ms, is_alive
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
    "#)
    .bind(&id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.price)
    .bind(req.original_price)
    .bind(req.rating)
    .bind(req.review_count)
    .bind(&req.brand)
    .bind(&req.category_slug)
    .bind(&req.image_url)
    .bind(req.stock)
    .bind(req.is_prime as i32)
    .bind(req.is_delivery_tomorrow as i32)
    .bind(req.is_featured as i32)
    .bind(now_ms)
    .bind(now_ms)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    info!("Product created: id={}, category={}", id, req.category_slug);

    let product = fetch_product(&state, &id).await?;
    ok(ProductResponse::from(&product))
}

/// PUT /api/products/:id - 商品更新
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<ProductResponse> {
    // 既存チェック
    let existing = fetch_product(&state, &id).await?;

    if let Some(title) = &req.title {
        require("title", title)?;
    }
    validate_pricing(
        req.price.unwrap_or(existing.price),
        req.original_price.or(existing.original_price),
    )?;
    if let Some(rating) = req.rating {
        validate_rating(rating)?;
    }
    if req.stock.is_some_and(|s| s < 0) || req.review_count.is_some_and(|c| c < 0) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "stock and review_count must not be negative".to_string(),
        ));
    }
    if let Some(slug) = &req.category_slug {
        fetch_category(&state, slug).await.map_err(|_| {
            error_response(StatusCode::BAD_REQUEST, format!("Category not found: {}", slug))
        })?;
    }

    // DB更新
    sqlx::query(r#"
        UPDATE products SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            price = COALESCE(?, price),
            original_price = COALESCE(?, original_price),
            rating = COALESCE(?, rating),
            review_count = COALESCE(?, review_count),
            brand = COALESCE(?, brand),
            category_slug = COALESCE(?, category_slug),
            image_url = COALESCE(?, image_url),
            stock = COALESCE(?, stock),
            is_prime = COALESCE(?, is_prime),
            is_delivery_tomorrow = COALESCE(?, is_delivery_tomorrow),
            is_featured = COALESCE(?, is_featured),
            updated_at_ms = ?
        WHERE id = ?
    "#)
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.price)
    .bind(req.original_price)
    .bind(req.rating)
    .bind(req.review_count)
    .bind(&req.brand)
    .bind(&req.category_slug)
    .bind(&req.image_url)
    .bind(req.stock)
    .bind(req.is_prime.map(i32::from))
    .bind(req.is_delivery_tomorrow.map(i32::from))
    .bind(req.is_featured.map(i32::from))
    .bind(now_ms())
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    info!("Product updated: id={}", id);

    let product = fetch_product(&state, &id).await?;
    ok(ProductResponse::from(&product))
}

/// DELETE /api/products/:id - 商品削除（論理削除）
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<IdResponse> {
    let result = sqlx::query(
        "UPDATE products SET is_alive = 0, updated_at_ms = ? WHERE id = ? AND is_alive = 1"
    )
    .bind(now_ms())
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Product"));
    }

    info!("Product deleted: id={}", id);
    ok(IdResponse { id })
}

// ========================================
// Helper Functions
// ========================================

pub(crate) async fn fetch_product(state: &AppState, id: &str) -> Result<Product, HandlerError> {
    sqlx::query_as("SELECT * FROM products WHERE id = ? AND is_alive = 1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Product"))
}

fn matches_search(product: &Product, term: &str) -> bool {
    product.title.to_lowercase().contains(term)
        || product
            .brand
            .as_deref()
            .is_some_and(|b| b.to_lowercase().contains(term))
}

fn validate_pricing(price: f64, original_price: Option<f64>) -> Result<(), HandlerError> {
    if !price.is_finite() || price < 0.0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid price: {}", price),
        ));
    }
    if let Some(original) = original_price {
        if !original.is_finite() || original < price {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("original_price {} must not be below price {}", original, price),
            ));
        }
    }
    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), HandlerError> {
    if !(0.0..=MAX_RATING).contains(&rating) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Rating must be between 0 and 5, got {}", rating),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_validation() {
        assert!(validate_pricing(10.0, Some(12.0)).is_ok());
        assert!(validate_pricing(10.0, None).is_ok());
        assert!(validate_pricing(-1.0, None).is_err());
        assert!(validate_pricing(10.0, Some(9.0)).is_err());
        assert!(validate_pricing(f64::NAN, None).is_err());
    }
}
