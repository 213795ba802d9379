//! Payment Methods API Handlers
//! /api/users/:id/payment-methods, /api/payment-methods/:id
//!
//! カード番号は保存しない。ブランド・下4桁・HMAC-SHA256指紋のみ。
//! 指紋の鍵はサーバー設定（`CARD_FINGERPRINT_KEY`）から取る。

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Datelike;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::info;

use super::users::fetch_user;
use super::{
    db_error, error_response, new_id, not_found, now_ms, ok, require, ApiResult, HandlerError,
};
use crate::models::{
    CreatePaymentMethodRequest, IdResponse, PaymentMethod, PaymentMethodResponse,
};
use crate::AppState;

// ========================================
// Handlers
// ========================================

/// GET /api/users/:id/payment-methods - 支払い方法一覧
pub async fn list_payment_methods(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<PaymentMethodResponse>> {
    fetch_user(&state, &user_id).await?;

    let methods: Vec<PaymentMethod> = sqlx::query_as(
        "SELECT * FROM payment_methods WHERE user_id = ? ORDER BY is_default DESC, created_at_ms ASC, id ASC"
    )
    .bind(&user_id)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    ok(methods.iter().map(PaymentMethodResponse::from).collect())
}

/// POST /api/users/:id/payment-methods - カード登録
pub async fn create_payment_method(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<CreatePaymentMethodRequest>,
) -> ApiResult<PaymentMethodResponse> {
    fetch_user(&state, &user_id).await?;
    require("holder_name", &req.holder_name)?;

    let digits = normalize_card_number(&req.card_number).ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "Invalid card number".to_string())
    })?;
    validate_expiry(req.exp_month, req.exp_year)?;

    let brand = card_brand(&digits);
    let last4 = digits[digits.len() - 4..].to_string();
    let fingerprint = card_fingerprint(state.config.card_fingerprint_key.as_bytes(), &digits)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let id = new_id();
    let mut tx = state.db.begin().await.map_err(db_error)?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_methods WHERE user_id = ?")
        .bind(&user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

    let result = sqlx::query(r#"
        INSERT INTO payment_methods (
            id, user_id, brand, last4, fingerprint, holder_name,
            exp_month, exp_year, is_default, created_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, fingerprint) DO NOTHING
    "#)
    .bind(&id)
    .bind(&user_id)
    .bind(brand)
    .bind(&last4)
    .bind(&fingerprint)
    .bind(req.holder_name.trim())
    .bind(req.exp_month)
    .bind(req.exp_year)
    .bind((existing == 0) as i32)
    .bind(now_ms())
    .execute(&mut *tx)
    .await
    .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Card ending in {} is already registered", last4),
        ));
    }

    tx.commit().await.map_err(db_error)?;

    info!("Payment method added: id={}, user={}, brand={}", id, user_id, brand);

    let method = fetch_payment_method(&state, &id).await?;
    ok(PaymentMethodResponse::from(&method))
}

/// PUT /api/payment-methods/:id/default - 既定の支払い方法を切り替え
pub async fn set_default_payment_method(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<PaymentMethodResponse> {
    let method = fetch_payment_method(&state, &id).await?;
    let mut tx = state.db.begin().await.map_err(db_error)?;

    sqlx::query("UPDATE payment_methods SET is_default = 0 WHERE user_id = ?")
        .bind(&method.user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
    sqlx::query("UPDATE payment_methods SET is_default = 1 WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    info!("Default payment method: id={}, user={}", id, method.user_id);

    let method = fetch_payment_method(&state, &id).await?;
    ok(PaymentMethodResponse::from(&method))
}

/// DELETE /api/payment-methods/:id - 支払い方法削除
pub async fn delete_payment_method(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<IdResponse> {
    let method = fetch_payment_method(&state, &id).await?;
    let mut tx = state.db.begin().await.map_err(db_error)?;

    sqlx::query("DELETE FROM payment_methods WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    // 既定を消した場合は最も古いカードを繰り上げ
    if method.is_default == 1 {
        sqlx::query(r#"
            UPDATE payment_methods SET is_default = 1
            WHERE id = (
                SELECT id FROM payment_methods WHERE user_id = ?
                ORDER BY created_at_ms ASC, id ASC LIMIT 1
            )
        "#)
        .bind(&method.user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
    }

    tx.commit().await.map_err(db_error)?;

    info!("Payment method deleted: id={}, user={}", id, method.user_id);
    ok(IdResponse { id })
}

// ========================================
// Helper Functions
// ========================================

async fn fetch_payment_method(state: &AppState, id: &str) -> Result<PaymentMethod, HandlerError> {
    sqlx::query_as("SELECT * FROM payment_methods WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Payment method"))
}

/// 空白とハイフンを除去し、桁数と Luhn チェックを通れば数字列を返す
pub fn normalize_card_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    luhn_valid(&digits).then_some(digits)
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// 先頭桁からカードブランドを判定
pub fn card_brand(digits: &str) -> &'static str {
    let prefix2: u32 = digits.get(..2).and_then(|p| p.parse().ok()).unwrap_or(0);
    let prefix4: u32 = digits.get(..4).and_then(|p| p.parse().ok()).unwrap_or(0);

    if digits.starts_with('4') {
        "visa"
    } else if (51..=55).contains(&prefix2) || (2221..=2720).contains(&prefix4) {
        "mastercard"
    } else if prefix2 == 34 || prefix2 == 37 {
        "amex"
    } else if digits.starts_with("6011") || prefix2 == 65 {
        "discover"
    } else if (3528..=3589).contains(&prefix4) {
        "jcb"
    } else {
        "unknown"
    }
}

type HmacSha256 = Hmac<Sha256>;

/// 鍵付き指紋（重複登録の検出用）
///
/// 下4桁と先頭桁が分かっていても、鍵なしでは番号を総当たりで戻せない。
fn card_fingerprint(key: &[u8], digits: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| format!("Invalid fingerprint key: {}", e))?;
    mac.update(digits.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn validate_expiry(month: i64, year: i64) -> Result<(), HandlerError> {
    if !(1..=12).contains(&month) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid expiry month: {}", month),
        ));
    }

    let today = chrono::Utc::now().date_naive();
    let current = (i64::from(today.year()), i64::from(today.month()));
    if (year, month) < current {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Card expired: {:02}/{}", month, year),
        ));
    }
    Ok(())
}
