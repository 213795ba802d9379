//! Database Module
//! SQLite を使用した categories/products/orders/users などの管理

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tracing::info;

use crate::catalog::StaticCategory;

/// データベース接続プール
pub type DbPool = Pool<Sqlite>;

/// 静的カタログ投入時に「おすすめ」にする評価の下限
const SEED_FEATURED_MIN_RATING: f64 = 4.8;

/// データベースを初期化
pub async fn init_db(db_path: &str) -> Result<DbPool> {
    // SQLite接続文字列
    let db_url = format!("sqlite:{}?mode=rwc", db_path);

    info!("Initializing database: {}", db_path);

    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database {}", db_path))?;

    // スキーマ作成
    create_schema(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// スキーマ作成
async fn create_schema(pool: &DbPool) -> Result<()> {
    // categories テーブル（slug が主キー）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS categories (
            slug TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            image_url TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL
        )
    "#)
    .execute(pool)
    .await?;

    // products テーブル（価格は USD）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            price REAL NOT NULL,
            original_price REAL,
            rating REAL NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0,
            brand TEXT,
            category_slug TEXT NOT NULL,
            image_url TEXT,
            stock INTEGER NOT NULL DEFAULT 0,
            is_prime INTEGER NOT NULL DEFAULT 0,
            is_delivery_tomorrow INTEGER NOT NULL DEFAULT 0,
            is_featured INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL,
            is_alive INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (category_slug) REFERENCES categories(slug)
        )
    "#)
    .execute(pool)
    .await?;

    // banners テーブル（トップページ）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS banners (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            subtitle TEXT,
            image_url TEXT NOT NULL,
            link_url TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL
        )
    "#)
    .execute(pool)
    .await?;

    // users テーブル
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            role INTEGER NOT NULL DEFAULT 0,
            status INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL,
            is_alive INTEGER NOT NULL DEFAULT 1
        )
    "#)
    .execute(pool)
    .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool).await?;

    // orders テーブル
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            order_number TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            address_id TEXT,
            payment_method_id TEXT,
            status INTEGER NOT NULL DEFAULT 0,
            subtotal REAL NOT NULL,
            shipping REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
    "#)
    .execute(pool)
    .await?;

    // order_items テーブル（注文時点の価格を保持）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS order_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            title TEXT NOT NULL,
            unit_price REAL NOT NULL,
            quantity INTEGER NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id)
        )
    "#)
    .execute(pool)
    .await?;

    // addresses テーブル
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS addresses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            full_name TEXT NOT NULL,
            line1 TEXT NOT NULL,
            line2 TEXT,
            city TEXT NOT NULL,
            state TEXT,
            postal_code TEXT NOT NULL,
            country TEXT NOT NULL,
            phone TEXT,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
    "#)
    .execute(pool)
    .await?;

    // payment_methods テーブル（カード番号は保存しない）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS payment_methods (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            brand TEXT NOT NULL,
            last4 TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            holder_name TEXT NOT NULL,
            exp_month INTEGER NOT NULL,
            exp_year INTEGER NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id),
            UNIQUE(user_id, fingerprint)
        )
    "#)
    .execute(pool)
    .await?;

    // wishlist テーブル
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS wishlist (
            user_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            added_at_ms INTEGER NOT NULL,
            PRIMARY KEY (user_id, product_id)
        )
    "#)
    .execute(pool)
    .await?;

    // notifications テーブル
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL
        )
    "#)
    .execute(pool)
    .await?;

    // インデックス作成
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_slug)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_is_alive ON products(is_alive)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_addresses_user ON addresses(user_id)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payment_methods_user ON payment_methods(user_id)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)")
        .execute(pool).await?;

    Ok(())
}

/// 商品が1件もない場合、静的カタログを投入する
///
/// 投入した商品数を返す（既にデータがあれば 0）。
pub async fn seed_static_catalog(pool: &DbPool) -> Result<usize> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        info!("Skipping catalog seed: {} products already present", existing);
        return Ok(0);
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;
    let mut count = 0;

    for (position, category) in StaticCategory::ALL.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO categories (slug, name, description, position, created_at_ms, updated_at_ms) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(category.slug())
        .bind(category.display_name())
        .bind(category.description())
        .bind(position as i64)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        for product in category.products() {
            sqlx::query(r#"
                INSERT INTO products (
                    id, title, price, original_price, rating, review_count,
                    brand, category_slug, stock, is_prime, is_delivery_tomorrow,
                    is_featured, created_at_ms, updated_at_ms, is_alive
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 100, ?, ?, ?, ?, ?, 1)
            "#)
            .bind(product.id)
            .bind(product.title)
            .bind(product.price)
            .bind(product.original_price)
            .bind(product.rating)
            .bind(product.review_count)
            .bind(product.brand)
            .bind(category.slug())
            .bind(product.is_prime as i32)
            .bind(product.is_delivery_tomorrow as i32)
            .bind((product.rating >= SEED_FEATURED_MIN_RATING) as i32)
            .bind(now_ms)
            .bind(now_ms)
            .execute(&mut *tx)
            .await?;
            count += 1;
        }
    }

    tx.commit().await?;

    info!("Seeded {} products from static catalog", count);
    Ok(count)
}
