//! HTTP API の結合テスト（ルーターを直接呼ぶ）

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use common::test_app;

fn prices(body: &Value) -> Vec<f64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["price"].as_f64().unwrap())
        .collect()
}

fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

async fn create_user(app: &common::TestApp, name: &str, email: &str) -> String {
    let (status, body) = app
        .post("/api/users", json!({ "name": name, "email": email }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

// ========================================
// Catalog
// ========================================

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn categories_include_product_counts() {
    let app = test_app().await;
    let (status, body) = app.get("/api/categories").await;
    assert_eq!(status, StatusCode::OK);

    let categories = body["data"].as_array().unwrap();
    assert_eq!(categories.len(), 5);
    assert_eq!(categories[0]["slug"], "electronics");
    assert_eq!(categories[0]["product_count"], 15);
}

#[tokio::test]
async fn category_products_are_sorted_and_paged() {
    let app = test_app().await;
    let (status, body) = app
        .get("/api/categories/electronics/products?sort=price-low&limit=5")
        .await;
    assert_eq!(status, StatusCode::OK);

    let prices = prices(&body);
    assert_eq!(prices.len(), 5);
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(prices[0], 21.99);
    assert_eq!(body["pagination"]["total"], 15);
    assert_eq!(body["pagination"]["total_pages"], 3);
    assert_eq!(body["pagination"]["page"], 1);
}

#[tokio::test]
async fn featured_products_come_first() {
    let app = test_app().await;
    let (_, body) = app.get("/api/categories/electronics/products").await;
    // 評価 4.8 以上はおすすめ扱いで投入される
    assert_eq!(ids(&body)[0], "el-002");
    assert_eq!(body["data"][0]["is_featured"], true);
}

#[tokio::test]
async fn brand_filter_selects_three_apple_products() {
    let app = test_app().await;
    let (status, body) = app
        .get("/api/categories/electronics/products?brands=Apple")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 3);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|item| item["brand"] == "Apple"));
}

#[tokio::test]
async fn min_rating_filter_is_inclusive() {
    let app = test_app().await;
    let (_, body) = app
        .get("/api/categories/electronics/products?min_rating=4.7&limit=50")
        .await;
    let ratings: Vec<f64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["rating"].as_f64().unwrap())
        .collect();
    assert!(!ratings.is_empty());
    assert!(ratings.iter().all(|r| *r >= 4.7));
    assert!(ratings.contains(&4.7));
}

#[tokio::test]
async fn out_of_range_page_is_clamped() {
    let app = test_app().await;
    let (status, body) = app
        .get("/api/categories/electronics/products?page=99&limit=12")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn price_range_uses_requested_currency() {
    let app = test_app().await;

    let (_, usd) = app
        .get("/api/categories/electronics/products?max_price=21")
        .await;
    assert_eq!(usd["pagination"]["total"], 0);
    assert_eq!(usd["data"], json!([]));

    let (_, eur) = app
        .get("/api/categories/electronics/products?max_price=21&currency=EUR")
        .await;
    assert_eq!(eur["pagination"]["total"], 1);
    assert_eq!(prices(&eur), vec![20.23]);
}

#[tokio::test]
async fn bad_listing_parameters_are_rejected() {
    let app = test_app().await;

    let (status, body) = app
        .get("/api/categories/electronics/products?sort=random")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("random"));

    let (status, _) = app
        .get("/api/categories/electronics/products?min_price=50&max_price=10")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/categories/garden/products").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ========================================
// Admin CRUD
// ========================================

#[tokio::test]
async fn product_lifecycle() {
    let app = test_app().await;

    let (status, _) = app
        .post(
            "/api/products",
            json!({ "title": "Mystery", "price": 5.0, "category_slug": "garden" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app
        .post(
            "/api/products",
            json!({
                "title": "Mechanical Keyboard",
                "price": 89.0,
                "original_price": 119.0,
                "brand": "Keychron",
                "category_slug": "electronics",
                "stock": 10,
                "rating": 4.6
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["discount"], 25);

    let (status, updated) = app
        .put(&format!("/api/products/{id}"), json!({ "price": 79.0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["price"], 79.0);
    assert_eq!(updated["data"]["title"], "Mechanical Keyboard");

    let (_, listed) = app.get("/api/products?search=keychron").await;
    assert_eq!(ids(&listed), vec![id.clone()]);

    let (status, _) = app.delete(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_with_products_cannot_be_deleted() {
    let app = test_app().await;

    let (status, _) = app.delete("/api/categories/books").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/api/categories", json!({ "slug": "garden", "name": "Garden" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post("/api/categories", json!({ "slug": "garden", "name": "Garden" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.delete("/api/categories/garden").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn category_with_only_deleted_products_can_be_deleted() {
    let app = test_app().await;
    let user = create_user(&app, "Rin", "rin@example.com").await;

    app.post("/api/categories", json!({ "slug": "garden", "name": "Garden" }))
        .await;
    let (_, created) = app
        .post(
            "/api/products",
            json!({ "title": "Watering Can", "price": 18.5, "category_slug": "garden", "stock": 3 }),
        )
        .await;
    let product_id = created["data"]["id"].as_str().unwrap().to_string();

    let (_, order) = app
        .post(
            "/api/orders",
            json!({ "user_id": user, "items": [{ "product_id": product_id }] }),
        )
        .await;
    let order_id = order["data"]["id"].as_str().unwrap().to_string();
    app.post(
        &format!("/api/users/{user}/wishlist"),
        json!({ "product_id": product_id }),
    )
    .await;

    let (status, _) = app.delete(&format!("/api/products/{product_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete("/api/categories/garden").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = app.get("/api/categories/garden").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 注文明細は商品の削除後も残る
    let (_, order) = app.get(&format!("/api/orders/{order_id}")).await;
    assert_eq!(order["data"]["items"][0]["title"], "Watering Can");

    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlist WHERE user_id = ?")
        .bind(&user)
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn banners_hide_inactive_by_default() {
    let app = test_app().await;
    for (title, position, active) in [("Summer", 1, true), ("Winter", 0, false), ("Prime", 0, true)] {
        let (status, _) = app
            .post(
                "/api/banners",
                json!({
                    "title": title,
                    "image_url": "https://cdn.example.com/b.png",
                    "position": position,
                    "is_active": active
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app.get("/api/banners").await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Prime", "Summer"]);

    let (_, all) = app.get("/api/banners?include_inactive=true").await;
    assert_eq!(all["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn users_have_unique_emails() {
    let app = test_app().await;
    create_user(&app, "Jane Doe", "Jane@Example.com").await;

    let (status, _) = app
        .post("/api/users", json!({ "name": "Other", "email": "jane@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/api/users", json!({ "name": "Bad", "email": "not-an-email" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = app.get("/api/users?search=jane").await;
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["email"], "jane@example.com");
}

// ========================================
// Customer flows
// ========================================

#[tokio::test]
async fn order_lifecycle_updates_stock_and_notifications() {
    let app = test_app().await;
    let user = create_user(&app, "Sam", "sam@example.com").await;

    let (status, address) = app
        .post(
            &format!("/api/users/{user}/addresses"),
            json!({
                "full_name": "Sam Smith",
                "line1": "1 Main St",
                "city": "Springfield",
                "postal_code": "12345",
                "country": "US"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(address["data"]["is_default"], true);
    let address_id = address["data"]["id"].as_str().unwrap().to_string();

    let (status, order) = app
        .post(
            "/api/orders",
            json!({
                "user_id": user,
                "address_id": address_id,
                "items": [
                    { "product_id": "bk-007", "quantity": 2 },
                    { "product_id": "el-010" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{order}");
    let order = &order["data"];
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD_"));
    assert_eq!(order["subtotal"], 43.97);
    assert_eq!(order["shipping"], 0.0);
    assert_eq!(order["total"], 43.97);
    assert_eq!(order["status_label"], "pending");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, product) = app.get("/api/products/bk-007").await;
    assert_eq!(product["data"]["stock"], 98);

    // pending から shipped へは飛べない
    let (status, _) = app
        .put(&format!("/api/orders/{order_id}/status"), json!({ "status": 2 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&format!("/api/orders/{order_id}/status"), json!({ "status": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, notifications) = app.get(&format!("/api/users/{user}/notifications")).await;
    assert_eq!(notifications["data"]["unread_count"], 2);

    let (status, cancelled) = app
        .put(&format!("/api/orders/{order_id}/status"), json!({ "status": 4 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status_label"], "cancelled");

    let (_, product) = app.get("/api/products/bk-007").await;
    assert_eq!(product["data"]["stock"], 100);

    let (_, stats) = app.get("/api/admin/stats").await;
    assert_eq!(stats["data"]["orders"], 1);
    assert_eq!(stats["data"]["pending_orders"], 0);
    assert_eq!(stats["data"]["revenue"], 0.0);

    let (_, history) = app.get(&format!("/api/users/{user}/orders")).await;
    assert_eq!(history["pagination"]["total"], 1);

    app.put(&format!("/api/users/{user}/notifications/read-all"), json!({}))
        .await;
    let (_, notifications) = app
        .get(&format!("/api/users/{user}/notifications?unread_only=true"))
        .await;
    assert_eq!(notifications["data"]["unread_count"], 0);
    assert_eq!(notifications["data"]["notifications"], json!([]));
}

#[tokio::test]
async fn small_orders_pay_shipping_and_stock_is_checked() {
    let app = test_app().await;
    let user = create_user(&app, "Kim", "kim@example.com").await;

    let (status, order) = app
        .post(
            "/api/orders",
            json!({ "user_id": user, "items": [{ "product_id": "bk-007", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["data"]["shipping"], 5.99);
    assert_eq!(order["data"]["total"], 16.98);

    let (status, _) = app
        .post(
            "/api/orders",
            json!({ "user_id": user, "items": [{ "product_id": "bk-007", "quantity": 500 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/orders",
            json!({ "user_id": user, "items": [{ "product_id": "bk-007", "quantity": 0 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 失敗した注文は在庫を消費しない
    let (_, product) = app.get("/api/products/bk-007").await;
    assert_eq!(product["data"]["stock"], 99);
}

#[tokio::test]
async fn payment_methods_are_fingerprinted() {
    let app = test_app().await;
    let user = create_user(&app, "Lee", "lee@example.com").await;
    let uri = format!("/api/users/{user}/payment-methods");

    let card = |number: &str| {
        json!({
            "card_number": number,
            "holder_name": "Lee",
            "exp_month": 12,
            "exp_year": 2099
        })
    };

    let (status, first) = app.post(&uri, card("4242 4242 4242 4242")).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["data"]["brand"], "visa");
    assert_eq!(first["data"]["last4"], "4242");
    assert_eq!(first["data"]["is_default"], true);
    assert!(first["data"].get("fingerprint").is_none());

    // 保存される指紋は鍵付きで、番号の素の SHA256 ではない
    let (fingerprint,): (String,) =
        sqlx::query_as("SELECT fingerprint FROM payment_methods WHERE user_id = ?")
            .bind(&user)
            .fetch_one(&app.state.db)
            .await
            .unwrap();
    let plain = hex::encode(Sha256::digest(b"4242424242424242"));
    assert_eq!(fingerprint.len(), 64);
    assert_ne!(fingerprint, plain);

    let (status, _) = app.post(&uri, card("4242-4242-4242-4242")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post(&uri, card("4242 4242 4242 4241")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, second) = app.post(&uri, card("5555 5555 5555 4444")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["is_default"], false);
    let second_id = second["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(&format!("/api/payment-methods/{second_id}/default"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = app.get(&uri).await;
    assert_eq!(listed["data"][0]["id"], second_id.as_str());
    assert_eq!(listed["data"][0]["is_default"], true);
    assert_eq!(listed["data"][1]["is_default"], false);
}

#[tokio::test]
async fn wishlist_add_is_idempotent() {
    let app = test_app().await;
    let user = create_user(&app, "Ana", "ana@example.com").await;
    let uri = format!("/api/users/{user}/wishlist");

    for _ in 0..2 {
        let (status, _) = app.post(&uri, json!({ "product_id": "el-006" })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app.post(&uri, json!({ "product_id": "nope" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.get(&uri).await;
    let entries = listed["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["product"]["brand"], "Sony");

    let (status, _) = app.delete(&format!("{uri}/el-006")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("{uri}/el-006")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wishlist_lists_live_products_newest_first() {
    let app = test_app().await;
    let user = create_user(&app, "Noa", "noa@example.com").await;
    let uri = format!("/api/users/{user}/wishlist");

    let (_, created) = app
        .post(
            "/api/products",
            json!({ "title": "Yoga Mat", "price": 25.0, "category_slug": "sports" }),
        )
        .await;
    let mat = created["data"]["id"].as_str().unwrap().to_string();

    for product_id in ["el-006", "bk-007", mat.as_str()] {
        app.post(&uri, json!({ "product_id": product_id })).await;
    }
    app.delete(&format!("/api/products/{mat}")).await;

    let (_, listed) = app.get(&uri).await;
    let entries = listed["data"].as_array().unwrap();
    let ids: Vec<&str> = entries
        .iter()
        .map(|e| e["product"]["id"].as_str().unwrap())
        .collect();
    // 同じミリ秒なら product_id 順
    assert_eq!(ids, vec!["bk-007", "el-006"]);
    assert_eq!(entries[0]["product"]["price"], 10.99);
    assert_eq!(entries[0]["product"]["category"], "books");
    assert!(entries[0]["added_at_ms"].as_i64().unwrap() >= entries[1]["added_at_ms"].as_i64().unwrap());
}

#[tokio::test]
async fn default_address_moves_on_delete() {
    let app = test_app().await;
    let user = create_user(&app, "Max", "max@example.com").await;
    let uri = format!("/api/users/{user}/addresses");

    let address = |line1: &str| {
        json!({
            "full_name": "Max",
            "line1": line1,
            "city": "Berlin",
            "postal_code": "10115",
            "country": "DE"
        })
    };

    let (_, home) = app.post(&uri, address("Home 1")).await;
    let (_, work) = app.post(&uri, address("Work 2")).await;
    assert_eq!(home["data"]["is_default"], true);
    assert_eq!(work["data"]["is_default"], false);

    let home_id = home["data"]["id"].as_str().unwrap();
    let (status, _) = app.delete(&format!("/api/addresses/{home_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = app.get(&uri).await;
    let remaining = listed["data"].as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["line1"], "Work 2");
    assert_eq!(remaining[0]["is_default"], true);
}
