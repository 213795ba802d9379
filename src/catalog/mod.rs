//! Catalog Module
//! 商品一覧の 絞り込み → 並び替え → ページ分割 パイプライン
//!
//! カテゴリ一覧ページと管理画面のテーブルで共通に使う。
//! すべて純粋関数で、入力のコレクションは変更しない。

pub mod currency;
pub mod filter;
pub mod paginate;
pub mod sort;
pub mod static_catalog;

use serde::{Deserialize, Serialize};

pub use currency::Currency;
pub use filter::{available_brands, filter_items, FilterState};
pub use paginate::{paginate, Page, PageChange, PageState, DEFAULT_ITEMS_PER_PAGE};
pub use sort::{sort_items, SortKey};
pub use static_catalog::{StaticCategory, StaticProduct};

// ========================================
// Item
// ========================================

/// 一覧に表示する商品レコード
///
/// 取得後は変更しない。再取得時は丸ごと置き換える。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    /// 0〜5
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
    #[serde(default)]
    pub brand: Option<String>,
    /// 割引率（%）
    #[serde(default)]
    pub discount: Option<i64>,
    #[serde(default)]
    pub is_prime: bool,
    #[serde(default)]
    pub is_delivery_tomorrow: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// データの出どころ。`Newest` と `Featured` の並び方が変わる
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogVariant {
    /// 埋め込みの静的カタログ
    Static,
    /// API から取得したデータ
    Dynamic,
}

/// 割引率（%）を元値と売値から計算
pub fn discount_percent(price: f64, original_price: Option<f64>) -> Option<i64> {
    match original_price {
        Some(original) if original > price && original > 0.0 => {
            Some(((original - price) / original * 100.0).round() as i64)
        }
        _ => None,
    }
}

/// 絞り込み → 並び替え → ページ分割 をまとめて実行
pub fn run_pipeline(
    items: &[CatalogItem],
    filters: &FilterState,
    sort: SortKey,
    page: &PageState,
    variant: CatalogVariant,
) -> Page<CatalogItem> {
    let filtered = filter_items(items, filters);
    let sorted = sort_items(&filtered, sort, variant);
    paginate(&sorted, page)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::CatalogItem;

    pub fn item(id: &str, price: f64, rating: f64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            title: format!("Item {id}"),
            price,
            original_price: None,
            rating,
            review_count: 0,
            brand: None,
            discount: None,
            is_prime: false,
            is_delivery_tomorrow: false,
            is_featured: false,
            category: None,
            image_url: None,
        }
    }
}
