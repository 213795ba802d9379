//! Orders API Handlers
//! /api/orders エンドポイント

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::SqliteExecutor;
use std::sync::Arc;
use tracing::info;

use super::notifications::push_notification;
use super::users::fetch_user;
use super::{
    db_error, error_response, new_id, not_found, now_ms, ok, page_state, ApiResult,
    HandlerError, PageQuery,
};
use crate::catalog::paginate;
use crate::models::{
    notification_kind, order_status, ApiEnvelope, CreateOrderRequest, Order, OrderItem,
    OrderResponse, Pagination, Product, UpdateOrderStatusRequest,
};
use crate::AppState;

/// 送料無料になる小計（USD）
pub const FREE_SHIPPING_THRESHOLD: f64 = 35.0;
/// 通常送料（USD）
pub const STANDARD_SHIPPING: f64 = 5.99;
/// 1注文あたりの最大明細数
const MAX_ORDER_LINES: usize = 50;

// ========================================
// Query Parameters
// ========================================

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<i32>,
}

// ========================================
// Handlers
// ========================================

/// GET /api/orders - 注文一覧（管理画面）
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Vec<OrderResponse>> {
    let orders: Vec<Order> = match query.status {
        Some(status) => {
            sqlx::query_as(
                "SELECT * FROM orders WHERE status = ? ORDER BY created_at_ms DESC, id ASC"
            )
            .bind(status)
            .fetch_all(&state.db)
            .await
        }
        None => {
            sqlx::query_as("SELECT * FROM orders ORDER BY created_at_ms DESC, id ASC")
                .fetch_all(&state.db)
                .await
        }
    }
    .map_err(db_error)?;

    let page = paginate(
        &orders,
        &page_state(query.page, query.limit, state.config.items_per_page),
    );
    let pagination = Pagination::from(&page);
    let responses = with_items(&state, &page.items).await?;

    Ok(Json(ApiEnvelope::paged(responses, pagination)))
}

/// GET /api/users/:id/orders - ユーザーの注文履歴
pub async fn list_user_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<OrderResponse>> {
    fetch_user(&state, &user_id).await?;

    let orders: Vec<Order> = sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at_ms DESC, id ASC"
    )
    .bind(&user_id)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let page = paginate(&orders, &query.page_state(state.config.items_per_page));
    let pagination = Pagination::from(&page);
    let responses = with_items(&state, &page.items).await?;

    Ok(Json(ApiEnvelope::paged(responses, pagination)))
}

/// GET /api/orders/:id - 注文詳細（明細付き）
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<OrderResponse> {
    let order = fetch_order(&state.db, &id).await?;
    let items = fetch_order_items(&state.db, &order.id).await?;
    ok(OrderResponse::from_order(&order, items))
}

/// POST /api/orders - 注文作成
///
/// 単価はリクエストではなく商品マスタから取る。
/// 在庫の引き当て・注文・明細・通知は1トランザクション。
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<OrderResponse> {
    if req.items.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Order must contain at least one item".to_string(),
        ));
    }
    if req.items.len() > MAX_ORDER_LINES {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Order may contain at most {} lines", MAX_ORDER_LINES),
        ));
    }
    if let Some(line) = req.items.iter().find(|line| line.quantity <= 0) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid quantity {} for product {}", line.quantity, line.product_id),
        ));
    }

    let user = fetch_user(&state, &req.user_id).await?;
    if let Some(address_id) = &req.address_id {
        ensure_owned(&state, "addresses", "Address", address_id, &user.id).await?;
    }
    if let Some(payment_method_id) = &req.payment_method_id {
        ensure_owned(&state, "payment_methods", "Payment method", payment_method_id, &user.id).await?;
    }

    let order_id = new_id();
    let order_number = generate_order_number();
    let now_ms = now_ms();

    let mut tx = state.db.begin().await.map_err(db_error)?;
    let mut lines: Vec<(Product, i64)> = Vec::with_capacity(req.items.len());

    for line in &req.items {
        let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = ? AND is_alive = 1")
            .bind(&line.product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Product not found: {}", line.product_id),
                )
            })?;

        // 在庫引き当て（同じ商品が複数行あっても累積で判定される）
        let reserved = sqlx::query(
            "UPDATE products SET stock = stock - ?, updated_at_ms = ? WHERE id = ? AND stock >= ?"
        )
        .bind(line.quantity)
        .bind(now_ms)
        .bind(&product.id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if reserved.rows_affected() == 0 {
            return Err(error_response(
                StatusCode::CONFLICT,
                format!("Insufficient stock for {}", product.title),
            ));
        }

        lines.push((product, line.quantity));
    }

    let subtotal = round_cents(
        lines
            .iter()
            .map(|(product, quantity)| product.price * *quantity as f64)
            .sum(),
    );
    let shipping = shipping_for(subtotal);
    let total = round_cents(subtotal + shipping);

    sqlx::query(r#"
        INSERT INTO orders (
            id, order_number, user_id, address_id, payment_method_id, status,
            subtotal, shipping, total, created_at_ms, updated_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#)
    .bind(&order_id)
    .bind(&order_number)
    .bind(&user.id)
    .bind(&req.address_id)
    .bind(&req.payment_method_id)
    .bind(order_status::PENDING)
    .bind(subtotal)
    .bind(shipping)
    .bind(total)
    .bind(now_ms)
    .bind(now_ms)
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    for (product, quantity) in &lines {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, title, unit_price, quantity) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&order_id)
        .bind(&product.id)
        .bind(&product.title)
        .bind(product.price)
        .bind(*quantity)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
    }

    push_notification(
        &mut *tx,
        &user.id,
        notification_kind::ORDER,
        "Order placed",
        &format!("Your order {} has been placed.", order_number),
    )
    .await?;

    tx.commit().await.map_err(db_error)?;

    info!(
        "Order created: id={}, number={}, user={}, total={:.2}",
        order_id, order_number, user.id, total
    );

    let order = fetch_order(&state.db, &order_id).await?;
    let items = fetch_order_items(&state.db, &order_id).await?;
    ok(OrderResponse::from_order(&order, items))
}

/// PUT /api/orders/:id/status - 注文ステータス更新
///
/// キャンセル時は在庫を戻す。
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    if !order_status::is_valid(req.status) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid status: {}", req.status),
        ));
    }

    let order = fetch_order(&state.db, &id).await?;

    if !order_status::can_transition(order.status, req.status) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Cannot change order status from {} to {}",
                order_status::label(order.status),
                order_status::label(req.status)
            ),
        ));
    }

    let now_ms = now_ms();
    let mut tx = state.db.begin().await.map_err(db_error)?;

    // 楽観ロック（同時更新で遷移が二重に適用されないように）
    let result = sqlx::query(
        "UPDATE orders SET status = ?, updated_at_ms = ? WHERE id = ? AND status = ?"
    )
    .bind(req.status)
    .bind(now_ms)
    .bind(&id)
    .bind(order.status)
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Order {} was modified concurrently", order.order_number),
        ));
    }

    if req.status == order_status::CANCELLED {
        sqlx::query(r#"
            UPDATE products SET stock = stock + (
                SELECT COALESCE(SUM(quantity), 0) FROM order_items
                WHERE order_items.order_id = ? AND order_items.product_id = products.id
            )
            WHERE id IN (SELECT product_id FROM order_items WHERE order_id = ?)
        "#)
        .bind(&id)
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
    }

    push_notification(
        &mut *tx,
        &order.user_id,
        notification_kind::ORDER,
        "Order updated",
        &format!(
            "Your order {} is now {}.",
            order.order_number,
            order_status::label(req.status)
        ),
    )
    .await?;

    tx.commit().await.map_err(db_error)?;

    info!(
        "Order status updated: id={}, {} -> {}",
        id,
        order_status::label(order.status),
        order_status::label(req.status)
    );

    let order = fetch_order(&state.db, &id).await?;
    let items = fetch_order_items(&state.db, &id).await?;
    ok(OrderResponse::from_order(&order, items))
}

// ========================================
// Helper Functions
// ========================================

async fn fetch_order<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<Order, HandlerError> {
    sqlx::query_as("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Order"))
}

async fn fetch_order_items<'e>(
    db: impl SqliteExecutor<'e>,
    order_id: &str,
) -> Result<Vec<OrderItem>, HandlerError> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = ? ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(db)
        .await
        .map_err(db_error)
}

async fn with_items(state: &AppState, orders: &[Order]) -> Result<Vec<OrderResponse>, HandlerError> {
    let mut responses = Vec::with_capacity(orders.len());
    for order in orders {
        let items = fetch_order_items(&state.db, &order.id).await?;
        responses.push(OrderResponse::from_order(order, items));
    }
    Ok(responses)
}

/// 住所・支払い方法が注文者のものか確認
async fn ensure_owned(
    state: &AppState,
    table: &str,
    what: &str,
    id: &str,
    user_id: &str,
) -> Result<(), HandlerError> {
    let sql = format!("SELECT user_id FROM {} WHERE id = ?", table);
    let owner: Option<(String,)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?;

    match owner {
        Some((owner,)) if owner == user_id => Ok(()),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("{} not found for user: {}", what, id),
        )),
    }
}

/// 注文番号生成 (ORD_ + base32 8文字)
fn generate_order_number() -> String {
    use rand::Rng;
    let random_bytes: [u8; 5] = rand::thread_rng().gen();
    let encoded = base32::encode(base32::Alphabet::Crockford, &random_bytes);
    format!("ORD_{}", &encoded[..8])
}

/// 送料（小計が閾値以上なら無料）
pub fn shipping_for(subtotal: f64) -> f64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0.0
    } else {
        STANDARD_SHIPPING
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
