//! Backend API Client
//! ストアフロント/管理画面から見たバックエンドAPI（reqwest）

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::catalog::filter::MAX_RATING;
use crate::catalog::{CatalogItem, Currency, FilterState, PageState, SortKey};
use crate::config::ClientConfig;
use crate::error::StoreError;
use crate::models::{
    ApiEnvelope, BannerResponse, CategoryResponse, CreateProductRequest, IdResponse, Pagination,
    ProductResponse, UpdateProductRequest,
};

/// リクエストのタイムアウト
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ========================================
// Query
// ========================================

/// 一覧取得の条件（絞り込み・並び替え・ページ・通貨）
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filters: FilterState,
    pub sort: SortKey,
    pub page: PageState,
    pub currency: Currency,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            filters: FilterState::new(),
            sort: SortKey::default(),
            page: PageState::default(),
            currency: Currency::default(),
        }
    }
}

impl ListingQuery {
    /// クエリ文字列のペア（既定値のものは送らない）
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.current_page().to_string()),
            ("limit", self.page.items_per_page().to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("currency", self.currency.code().to_string()),
        ];

        let (min, max) = self.filters.price_range();
        if min > 0.0 {
            pairs.push(("min_price", min.to_string()));
        }
        if max < f64::MAX {
            pairs.push(("max_price", max.to_string()));
        }
        if !self.filters.selected_brands().is_empty() {
            let brands: Vec<&str> = self.filters.selected_brands().iter().map(String::as_str).collect();
            pairs.push(("brands", brands.join(",")));
        }
        if self.filters.min_rating() > 0.0 {
            pairs.push(("min_rating", self.filters.min_rating().to_string()));
        }
        if let Some(category) = self.filters.category() {
            pairs.push(("category", category.to_string()));
        }
        pairs
    }
}

/// 取得済みの1ページ分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fetched {
    pub items: Vec<CatalogItem>,
    pub pagination: Pagination,
}

// ========================================
// Client
// ========================================

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, StoreError> {
        Self::new(config.backend_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ----- Storefront -----

    /// GET /api/categories/:slug/products
    pub async fn category_products(
        &self,
        slug: &str,
        query: &ListingQuery,
    ) -> Result<Fetched, StoreError> {
        let request = self
            .request(Method::GET, &format!("/api/categories/{}/products", slug))
            .query(&query.to_query_pairs());
        let (items, pagination) = self.send_paged(request).await?;
        Ok(Fetched { items, pagination })
    }

    pub async fn categories(&self) -> Result<Vec<CategoryResponse>, StoreError> {
        self.send(self.request(Method::GET, "/api/categories")).await
    }

    pub async fn category(&self, slug: &str) -> Result<CategoryResponse, StoreError> {
        self.send(self.request(Method::GET, &format!("/api/categories/{}", slug)))
            .await
    }

    /// 有効なバナー（表示順）
    pub async fn banners(&self) -> Result<Vec<BannerResponse>, StoreError> {
        self.send(self.request(Method::GET, "/api/banners")).await
    }

    // ----- Admin: products -----

    pub async fn products(
        &self,
        query: &ListingQuery,
        search: Option<&str>,
    ) -> Result<(Vec<ProductResponse>, Pagination), StoreError> {
        let mut pairs = query.to_query_pairs();
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        self.send_paged(self.request(Method::GET, "/api/products").query(&pairs))
            .await
    }

    pub async fn product(&self, id: &str) -> Result<ProductResponse, StoreError> {
        self.send(self.request(Method::GET, &format!("/api/products/{}", id)))
            .await
    }

    pub async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductResponse, StoreError> {
        validate_new_product(req)?;
        self.send(self.request(Method::POST, "/api/products").json(req))
            .await
    }

    pub async fn update_product(
        &self,
        id: &str,
        req: &UpdateProductRequest,
    ) -> Result<ProductResponse, StoreError> {
        validate_product_update(req)?;
        self.send(
            self.request(Method::PUT, &format!("/api/products/{}", id))
                .json(req),
        )
        .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<IdResponse, StoreError> {
        self.send(self.request(Method::DELETE, &format!("/api/products/{}", id)))
            .await
    }

    // ----- Plumbing -----

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let envelope = self.exchange(request).await?;
        envelope
            .data
            .ok_or_else(|| StoreError::Decode("response has no data".to_string()))
    }

    async fn send_paged<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<(T, Pagination), StoreError> {
        let envelope = self.exchange(request).await?;
        match (envelope.data, envelope.pagination) {
            (Some(data), Some(pagination)) => Ok((data, pagination)),
            (None, _) => Err(StoreError::Decode("response has no data".to_string())),
            (_, None) => Err(StoreError::Decode("response has no pagination".to_string())),
        }
    }

    /// 送信してエンベロープを読む（非2xx・success:false は Api エラー）
    async fn exchange<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiEnvelope<T>, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!("API response: status={}, {} bytes", status, body.len());

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                });
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_slice(&body).map_err(|e| StoreError::Decode(e.to_string()))?;

        if !envelope.success {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        Ok(envelope)
    }
}

/// エラー時の本文（message だけ拾う）
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ========================================
// Client-side validation
// ========================================

pub fn validate_new_product(req: &CreateProductRequest) -> Result<(), StoreError> {
    if req.title.trim().is_empty() {
        return Err(StoreError::Validation("title is required".to_string()));
    }
    if req.category_slug.trim().is_empty() {
        return Err(StoreError::Validation("category is required".to_string()));
    }
    validate_price(req.price, req.original_price)?;
    validate_rating(req.rating)?;
    if req.stock < 0 {
        return Err(StoreError::Validation("stock must not be negative".to_string()));
    }
    Ok(())
}

pub fn validate_product_update(req: &UpdateProductRequest) -> Result<(), StoreError> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(StoreError::Validation("title must not be empty".to_string()));
    }
    if let Some(price) = req.price {
        validate_price(price, req.original_price)?;
    }
    if let Some(rating) = req.rating {
        validate_rating(rating)?;
    }
    if req.stock.is_some_and(|s| s < 0) {
        return Err(StoreError::Validation("stock must not be negative".to_string()));
    }
    Ok(())
}

fn validate_price(price: f64, original_price: Option<f64>) -> Result<(), StoreError> {
    if !price.is_finite() || price < 0.0 {
        return Err(StoreError::Validation(format!("invalid price: {}", price)));
    }
    if original_price.is_some_and(|o| !o.is_finite() || o < price) {
        return Err(StoreError::Validation(
            "original price must not be below price".to_string(),
        ));
    }
    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), StoreError> {
    if !(0.0..=MAX_RATING).contains(&rating) {
        return Err(StoreError::Validation(format!("invalid rating: {}", rating)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(title: &str, price: f64) -> CreateProductRequest {
        CreateProductRequest {
            title: title.to_string(),
            description: None,
            price,
            original_price: None,
            brand: None,
            category_slug: "electronics".to_string(),
            image_url: None,
            stock: 1,
            rating: 0.0,
            review_count: 0,
            is_prime: false,
            is_delivery_tomorrow: false,
            is_featured: false,
        }
    }

    #[test]
    fn default_query_sends_only_paging_sort_and_currency() {
        let pairs = ListingQuery::default().to_query_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["page", "limit", "sort", "currency"]);
        assert!(pairs.contains(&("sort", "featured".to_string())));
        assert!(pairs.contains(&("currency", "USD".to_string())));
    }

    #[test]
    fn filters_become_query_pairs() {
        let query = ListingQuery {
            filters: FilterState::new()
                .with_price_range(10.0, 250.0)
                .unwrap()
                .with_brands(["Sony", "Apple"])
                .with_min_rating(4.0)
                .unwrap(),
            sort: SortKey::PriceLow,
            page: PageState::new(24).with_page(2),
            currency: Currency::Eur,
        };
        let pairs = query.to_query_pairs();
        assert!(pairs.contains(&("brands", "Apple,Sony".to_string())));
        assert!(pairs.contains(&("min_price", "10".to_string())));
        assert!(pairs.contains(&("max_price", "250".to_string())));
        assert!(pairs.contains(&("min_rating", "4".to_string())));
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(pairs.contains(&("limit", "24".to_string())));
        assert!(pairs.contains(&("sort", "price-low".to_string())));
    }

    #[test]
    fn invalid_products_are_rejected_before_sending() {
        assert!(validate_new_product(&new_product("Headphones", 99.0)).is_ok());
        assert!(matches!(
            validate_new_product(&new_product("  ", 99.0)),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            validate_new_product(&new_product("Headphones", -1.0)),
            Err(StoreError::Validation(_))
        ));

        let update = UpdateProductRequest {
            rating: Some(7.5),
            ..Default::default()
        };
        assert!(validate_product_update(&update).is_err());
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
