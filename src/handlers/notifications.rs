//! Notifications API Handlers
//! /api/users/:id/notifications, /api/notifications/:id/read

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use sqlx::SqliteExecutor;
use std::sync::Arc;
use tracing::{debug, info};

use super::users::fetch_user;
use super::{db_error, new_id, not_found, now_ms, ok, ApiResult, HandlerError};
use crate::models::{IdResponse, Notification, NotificationList, NotificationResponse};
use crate::AppState;

/// 一覧で返す最大件数
const MAX_NOTIFICATIONS: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /api/users/:id/notifications - 通知一覧（新しい順）
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListNotificationsQuery>,
) -> ApiResult<NotificationList> {
    fetch_user(&state, &user_id).await?;

    let notifications: Vec<Notification> = if query.unread_only {
        sqlx::query_as(
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 ORDER BY created_at_ms DESC, id ASC LIMIT ?"
        )
        .bind(&user_id)
        .bind(MAX_NOTIFICATIONS)
        .fetch_all(&state.db)
        .await
    } else {
        sqlx::query_as(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at_ms DESC, id ASC LIMIT ?"
        )
        .bind(&user_id)
        .bind(MAX_NOTIFICATIONS)
        .fetch_all(&state.db)
        .await
    }
    .map_err(db_error)?;

    let (unread_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0"
    )
    .bind(&user_id)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    ok(NotificationList {
        notifications: notifications.iter().map(NotificationResponse::from).collect(),
        unread_count,
    })
}

/// PUT /api/notifications/:id/read - 既読にする
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<IdResponse> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Notification"));
    }

    ok(IdResponse { id })
}

/// PUT /api/users/:id/notifications/read-all - すべて既読にする
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<IdResponse> {
    fetch_user(&state, &user_id).await?;

    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(&user_id)
        .execute(&state.db)
        .await
        .map_err(db_error)?;

    info!("Marked {} notifications read: user={}", result.rows_affected(), user_id);
    ok(IdResponse { id: user_id })
}

/// 通知を1件追加（注文処理のトランザクション内からも呼ぶ）
pub(crate) async fn push_notification<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: &str,
    kind: &str,
    title: &str,
    body: &str,
) -> Result<(), HandlerError> {
    let id = new_id();

    sqlx::query(r#"
        INSERT INTO notifications (id, user_id, kind, title, body, is_read, created_at_ms)
        VALUES (?, ?, ?, ?, ?, 0, ?)
    "#)
    .bind(&id)
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(now_ms())
    .execute(db)
    .await
    .map_err(db_error)?;

    debug!("Notification queued: id={}, user={}, kind={}", id, user_id, kind);
    Ok(())
}
