//! Storefront API
//!
//! E-commerce ストアフロントと管理コンソールのバックエンド、および
//! フロントエンド側の一覧ロジック（絞り込み・並び替え・ページ分割）。
//!
//! - [`catalog`]: 一覧パイプラインと静的カタログ
//! - [`listing`]: 一覧画面ごとの状態（読み込み状態・再試行・世代トークン）
//! - [`client`]: バックエンドAPIクライアント
//! - [`handlers`]: HTTP JSON API

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod models;

use config::AppConfig;
use db::DbPool;
use handlers::{
    addresses, admin, banners, categories, notifications, orders, payments, products, uploads,
    users, wishlist,
};

/// アップロードの最大サイズ
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// ハンドラ共有の状態
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// ヘルスチェック
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// ルーター構築
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads_dir = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/api/health", get(health_check))
        // カテゴリ
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/:slug",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/api/categories/:slug/products",
            get(categories::list_category_products),
        )
        // 商品
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        // トップページのバナー
        .route(
            "/api/banners",
            get(banners::list_banners).post(banners::create_banner),
        )
        .route(
            "/api/banners/:id",
            put(banners::update_banner).delete(banners::delete_banner),
        )
        // ユーザーとプロフィール
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/users/:id/orders", get(orders::list_user_orders))
        .route(
            "/api/users/:id/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route(
            "/api/users/:id/payment-methods",
            get(payments::list_payment_methods).post(payments::create_payment_method),
        )
        .route(
            "/api/users/:id/wishlist",
            get(wishlist::list_wishlist).post(wishlist::add_to_wishlist),
        )
        .route(
            "/api/users/:id/wishlist/:product_id",
            delete(wishlist::remove_from_wishlist),
        )
        .route(
            "/api/users/:id/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/users/:id/notifications/read-all",
            put(notifications::mark_all_read),
        )
        // 注文
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/status", put(orders::update_order_status))
        .route(
            "/api/addresses/:id",
            put(addresses::update_address).delete(addresses::delete_address),
        )
        .route(
            "/api/payment-methods/:id",
            delete(payments::delete_payment_method),
        )
        .route(
            "/api/payment-methods/:id/default",
            put(payments::set_default_payment_method),
        )
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        // 管理画面
        .route("/api/admin/stats", get(admin::dashboard_stats))
        .route("/api/uploads", post(uploads::upload_image))
        .nest_service("/uploads", uploads_dir)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// DB初期化からサーバー起動まで
pub async fn start_server(config: AppConfig) -> Result<()> {
    let db = db::init_db(&config.database_path).await?;

    if config.seed_catalog {
        db::seed_static_catalog(&db).await?;
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {:?}", config.upload_dir))?;

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState { db, config });
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Storefront API listening on {}", addr);
    info!("📦 Max upload size: {}MB", MAX_UPLOAD_BYTES / 1024 / 1024);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
