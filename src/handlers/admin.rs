//! Admin API Handlers
//! /api/admin/stats（ダッシュボード集計）

use axum::extract::State;
use std::sync::Arc;

use super::{db_error, ok, ApiResult};
use crate::models::{order_status, DashboardStats};
use crate::AppState;

/// GET /api/admin/stats - ダッシュボード集計
///
/// 売上はキャンセル以外の注文の合計（USD）。
pub async fn dashboard_stats(State(state): State<Arc<AppState>>) -> ApiResult<DashboardStats> {
    let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_alive = 1")
        .fetch_one(&state.db)
        .await
        .map_err(db_error)?;

    let (categories,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(&state.db)
        .await
        .map_err(db_error)?;

    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_alive = 1")
        .fetch_one(&state.db)
        .await
        .map_err(db_error)?;

    let (orders, pending_orders, revenue): (i64, i64, f64) = sqlx::query_as(r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status != ? THEN total ELSE 0.0 END), 0.0)
        FROM orders
    "#)
    .bind(order_status::PENDING)
    .bind(order_status::CANCELLED)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    ok(DashboardStats {
        products,
        categories,
        users,
        orders,
        pending_orders,
        revenue: (revenue * 100.0).round() / 100.0,
    })
}
