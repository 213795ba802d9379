//! Error Types
//! カタログ処理とAPIクライアントのエラー定義

use thiserror::Error;

/// カタログ（フィルタ・ソート・ページング）のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Invalid price range: min {min} is greater than max {max}")]
    InvalidPriceRange { min: f64, max: f64 },

    #[error("Rating must be between 0 and 5, got {0}")]
    InvalidRating(f64),

    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// バックエンドAPI呼び出しのエラー
///
/// UI 側ではすべて同じ扱い（メッセージ表示 + 再試行ボタン）になる。
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl StoreError {
    /// 再試行で回復しうるか（入力エラー以外）
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validation_errors_are_final() {
        let api = StoreError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert!(api.is_retryable());
        assert!(StoreError::Decode("truncated".into()).is_retryable());
        assert!(!StoreError::Validation("title is required".into()).is_retryable());
    }
}
