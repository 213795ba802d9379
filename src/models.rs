//! Data Models
//! Category, Product, Order などのデータ構造定義

use serde::{Deserialize, Serialize};

use crate::catalog::{discount_percent, CatalogItem, Page};

// ========================================
// Response Envelope
// ========================================

/// すべてのエンドポイント共通のレスポンス形式
/// `{ success, data | message, pagination? }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    pub fn paged(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: Some(pagination),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// ページ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            limit: page.items_per_page,
            total: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

/// 削除・更新などの結果（id のみ返す）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

// ========================================
// Status Constants
// ========================================

pub mod order_status {
    pub const PENDING: i32 = 0;
    pub const PROCESSING: i32 = 1;
    pub const SHIPPED: i32 = 2;
    pub const DELIVERED: i32 = 3;
    pub const CANCELLED: i32 = 4;

    pub fn label(status: i32) -> &'static str {
        match status {
            PENDING => "pending",
            PROCESSING => "processing",
            SHIPPED => "shipped",
            DELIVERED => "delivered",
            CANCELLED => "cancelled",
            _ => "unknown",
        }
    }

    pub fn is_valid(status: i32) -> bool {
        (PENDING..=CANCELLED).contains(&status)
    }

    /// 許可される状態遷移
    pub fn can_transition(from: i32, to: i32) -> bool {
        matches!(
            (from, to),
            (PENDING, PROCESSING)
                | (PROCESSING, SHIPPED)
                | (SHIPPED, DELIVERED)
                | (PENDING, CANCELLED)
                | (PROCESSING, CANCELLED)
        )
    }
}

pub mod user_role {
    pub const CUSTOMER: i32 = 0;
    pub const ADMIN: i32 = 1;

    pub fn is_valid(role: i32) -> bool {
        role == CUSTOMER || role == ADMIN
    }
}

pub mod user_status {
    pub const ACTIVE: i32 = 0;
    pub const SUSPENDED: i32 = 1;

    pub fn is_valid(status: i32) -> bool {
        status == ACTIVE || status == SUSPENDED
    }
}

pub mod notification_kind {
    pub const ORDER: &str = "order";
    pub const PROMOTION: &str = "promotion";
    pub const SYSTEM: &str = "system";
}

// ========================================
// Category
// ========================================

/// Category (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub position: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Category 作成リクエスト
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: i64,
}

/// Category 更新リクエスト
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub position: Option<i64>,
}

/// Category レスポンス（商品数付き）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub position: i64,
    pub product_count: i64,
}

// ========================================
// Product
// ========================================

/// Product (DB row)
/// 価格は USD で保存
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub rating: f64,
    pub review_count: i64,
    pub brand: Option<String>,
    pub category_slug: String,
    pub image_url: Option<String>,
    pub stock: i64,
    pub is_prime: i32,
    pub is_delivery_tomorrow: i32,
    pub is_featured: i32,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub is_alive: i32,
}

impl Product {
    pub fn to_catalog_item(&self) -> CatalogItem {
        CatalogItem {
            id: self.id.clone(),
            title: self.title.clone(),
            price: self.price,
            original_price: self.original_price,
            rating: self.rating,
            review_count: self.review_count,
            brand: self.brand.clone(),
            discount: discount_percent(self.price, self.original_price),
            is_prime: self.is_prime == 1,
            is_delivery_tomorrow: self.is_delivery_tomorrow == 1,
            is_featured: self.is_featured == 1,
            category: Some(self.category_slug.clone()),
            image_url: self.image_url.clone(),
        }
    }
}

/// Product 作成リクエスト
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub brand: Option<String>,
    pub category_slug: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
    #[serde(default)]
    pub is_prime: bool,
    #[serde(default)]
    pub is_delivery_tomorrow: bool,
    #[serde(default)]
    pub is_featured: bool,
}

/// Product 更新リクエスト
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub brand: Option<String>,
    pub category_slug: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<i64>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub is_prime: Option<bool>,
    pub is_delivery_tomorrow: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Product レスポンス（API返却用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount: Option<i64>,
    pub rating: f64,
    pub review_count: i64,
    pub brand: Option<String>,
    pub category_slug: String,
    pub image_url: Option<String>,
    pub stock: i64,
    pub is_prime: bool,
    pub is_delivery_tomorrow: bool,
    pub is_featured: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price,
            original_price: p.original_price,
            discount: discount_percent(p.price, p.original_price),
            rating: p.rating,
            review_count: p.review_count,
            brand: p.brand.clone(),
            category_slug: p.category_slug.clone(),
            image_url: p.image_url.clone(),
            stock: p.stock,
            is_prime: p.is_prime == 1,
            is_delivery_tomorrow: p.is_delivery_tomorrow == 1,
            is_featured: p.is_featured == 1,
            created_at_ms: p.created_at_ms,
            updated_at_ms: p.updated_at_ms,
        }
    }
}

// ========================================
// Banner (トップページ)
// ========================================

/// Banner (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i64,
    pub is_active: i32,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBannerRequest {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateBannerRequest {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerResponse {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i64,
    pub is_active: bool,
}

impl From<&Banner> for BannerResponse {
    fn from(b: &Banner) -> Self {
        Self {
            id: b.id.clone(),
            title: b.title.clone(),
            subtitle: b.subtitle.clone(),
            image_url: b.image_url.clone(),
            link_url: b.link_url.clone(),
            position: b.position,
            is_active: b.is_active == 1,
        }
    }
}

fn default_true() -> bool { true }

// ========================================
// User
// ========================================

/// User (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: i32,     // 0=customer, 1=admin
    pub status: i32,   // 0=active, 1=suspended
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub is_alive: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: i32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<i32>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: i32,
    pub status: i32,
    pub created_at_ms: i64,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            role: u.role,
            status: u.status,
            created_at_ms: u.created_at_ms,
        }
    }
}

// ========================================
// Order
// ========================================

/// Order (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub address_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub status: i32,
    pub subtotal: f64,
    pub shipping: f64,
    pub total: f64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Order Item (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    pub product_id: String,
    pub title: String,
    pub unit_price: f64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 { 1 }

/// Order 作成リクエスト
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub items: Vec<OrderItemRequest>,
    pub address_id: Option<String>,
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: i32,
}

/// Order レスポンス（明細付き）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub address_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub status: i32,
    pub status_label: String,
    pub subtotal: f64,
    pub shipping: f64,
    pub total: f64,
    pub items: Vec<OrderItem>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl OrderResponse {
    pub fn from_order(order: &Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id.clone(),
            order_number: order.order_number.clone(),
            user_id: order.user_id.clone(),
            address_id: order.address_id.clone(),
            payment_method_id: order.payment_method_id.clone(),
            status: order.status,
            status_label: order_status::label(order.status).to_string(),
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            items,
            created_at_ms: order.created_at_ms,
            updated_at_ms: order.updated_at_ms,
        }
    }
}

// ========================================
// Address
// ========================================

/// Address (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: i32,
    pub created_at_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAddressRequest {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateAddressRequest {
    pub full_name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResponse {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
}

impl From<&Address> for AddressResponse {
    fn from(a: &Address) -> Self {
        Self {
            id: a.id.clone(),
            user_id: a.user_id.clone(),
            full_name: a.full_name.clone(),
            line1: a.line1.clone(),
            line2: a.line2.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            postal_code: a.postal_code.clone(),
            country: a.country.clone(),
            phone: a.phone.clone(),
            is_default: a.is_default == 1,
        }
    }
}

// ========================================
// Payment Method
// ========================================

/// Payment Method (DB row)
/// カード番号そのものは保存しない（ブランド・下4桁・SHA256指紋のみ）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub id: String,
    pub user_id: String,
    pub brand: String,
    pub last4: String,
    pub fingerprint: String,
    pub holder_name: String,
    pub exp_month: i64,
    pub exp_year: i64,
    pub is_default: i32,
    pub created_at_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentMethodRequest {
    pub card_number: String,
    pub holder_name: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodResponse {
    pub id: String,
    pub brand: String,
    pub last4: String,
    pub holder_name: String,
    pub exp_month: i64,
    pub exp_year: i64,
    pub is_default: bool,
}

impl From<&PaymentMethod> for PaymentMethodResponse {
    fn from(m: &PaymentMethod) -> Self {
        Self {
            id: m.id.clone(),
            brand: m.brand.clone(),
            last4: m.last4.clone(),
            holder_name: m.holder_name.clone(),
            exp_month: m.exp_month,
            exp_year: m.exp_year,
            is_default: m.is_default == 1,
        }
    }
}

// ========================================
// Wishlist
// ========================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AddWishlistRequest {
    pub product_id: String,
}

/// Wishlist エントリ（商品情報付き）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub product: CatalogItem,
    pub added_at_ms: i64,
}

// ========================================
// Notification
// ========================================

/// Notification (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub is_read: i32,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at_ms: i64,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.clone(),
            kind: n.kind.clone(),
            title: n.title.clone(),
            body: n.body.clone(),
            is_read: n.is_read == 1,
            created_at_ms: n.created_at_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: i64,
}

// ========================================
// Admin Dashboard
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub products: i64,
    pub categories: i64,
    pub users: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub revenue: f64,
}

// ========================================
// Upload
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub thumbnail_url: String,
    pub sha256: String,
    pub width: u32,
    pub height: u32,
}
