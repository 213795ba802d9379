//! API Handlers
//! 各エンドポイントと共通ヘルパー

pub mod addresses;
pub mod admin;
pub mod banners;
pub mod categories;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod uploads;
pub mod users;
pub mod wishlist;

use axum::{http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::warn;

use crate::catalog::{Currency, FilterState, PageState, SortKey};
use crate::error::CatalogError;
use crate::models::{ApiEnvelope, ErrorResponse};

/// 1ページの最大件数
pub const MAX_PAGE_LIMIT: usize = 100;

pub type HandlerError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<ApiEnvelope<T>>, HandlerError>;

// ========================================
// Query Parameters
// ========================================

/// 一覧系の共通ページ指定
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn page_state(&self, default_limit: usize) -> PageState {
        page_state(self.page, self.limit, default_limit)
    }
}

/// 商品一覧のクエリ（絞り込み・並び替え・ページ・通貨）
///
/// `brands` はカンマ区切り。
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub brands: Option<String>,
    pub min_rating: Option<f64>,
    pub currency: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
}

impl CatalogQuery {
    pub fn filters(&self) -> Result<FilterState, CatalogError> {
        let mut filters = FilterState::new();
        if self.min_price.is_some() || self.max_price.is_some() {
            filters.set_price_range(
                self.min_price.unwrap_or(0.0),
                self.max_price.unwrap_or(f64::MAX),
            )?;
        }
        if let Some(rating) = self.min_rating {
            filters.set_min_rating(rating)?;
        }
        if let Some(brands) = &self.brands {
            filters.set_brands(brands.split(',').map(str::trim));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            filters.set_category(Some(category.to_string()));
        }
        Ok(filters)
    }

    pub fn sort_key(&self) -> Result<SortKey, CatalogError> {
        match self.sort.as_deref() {
            None | Some("") => Ok(SortKey::default()),
            Some(raw) => raw.parse(),
        }
    }

    pub fn currency(&self) -> Result<Currency, CatalogError> {
        match self.currency.as_deref() {
            None | Some("") => Ok(Currency::default()),
            Some(raw) => raw.parse(),
        }
    }

    pub fn page_state(&self, default_limit: usize) -> PageState {
        page_state(self.page, self.limit, default_limit)
    }

    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

pub fn page_state(page: Option<usize>, limit: Option<usize>, default_limit: usize) -> PageState {
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT);
    PageState::new(limit).with_page(page.unwrap_or(1))
}

// ========================================
// Helper Functions
// ========================================

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiEnvelope::ok(data)))
}

pub fn error_response(status: StatusCode, message: String) -> HandlerError {
    warn!("API Error: {}", message);
    (status, Json(ErrorResponse { success: false, message }))
}

pub fn db_error(e: sqlx::Error) -> HandlerError {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {}", e))
}

pub fn catalog_error(e: CatalogError) -> HandlerError {
    error_response(StatusCode::BAD_REQUEST, e.to_string())
}

pub fn not_found(what: &str) -> HandlerError {
    error_response(StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// 必須文字列フィールドの検証
pub fn require(field: &str, value: &str) -> Result<(), HandlerError> {
    if value.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("{} is required", field),
        ));
    }
    Ok(())
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_query_builds_filters() {
        let query = CatalogQuery {
            min_price: Some(10.0),
            brands: Some("Apple, Sony,,".into()),
            min_rating: Some(4.0),
            ..Default::default()
        };
        let filters = query.filters().unwrap();
        assert_eq!(filters.price_range(), (10.0, f64::MAX));
        assert_eq!(filters.selected_brands().len(), 2);
        assert_eq!(filters.min_rating(), 4.0);
    }

    #[test]
    fn catalog_query_rejects_inverted_range() {
        let query = CatalogQuery {
            min_price: Some(50.0),
            max_price: Some(10.0),
            ..Default::default()
        };
        assert!(query.filters().is_err());
    }

    #[test]
    fn page_limit_is_bounded() {
        let state = PageQuery { page: Some(0), limit: Some(10_000) }.page_state(12);
        assert_eq!(state.items_per_page(), MAX_PAGE_LIMIT);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn unknown_sort_and_currency_are_errors() {
        let query = CatalogQuery {
            sort: Some("random".into()),
            currency: Some("XYZ".into()),
            ..Default::default()
        };
        assert!(query.sort_key().is_err());
        assert!(query.currency().is_err());
    }
}
