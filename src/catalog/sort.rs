//! Sort stage

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CatalogItem, CatalogVariant};
use crate::error::CatalogError;

/// 並び替えキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    Rating,
    Newest,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Featured,
        SortKey::PriceLow,
        SortKey::PriceHigh,
        SortKey::Rating,
        SortKey::Newest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Featured => "featured",
            SortKey::PriceLow => "price-low",
            SortKey::PriceHigh => "price-high",
            SortKey::Rating => "rating",
            SortKey::Newest => "newest",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownSortKey(s.to_string()))
    }
}

/// 並び替えた新しい列を返す。入力は変更しない
///
/// 同値のアイテムは元の相対順序を保つ（安定ソート）ので、
/// 同じ入力なら何度描画してもページ分割の結果は変わらない。
pub fn sort_items(items: &[CatalogItem], key: SortKey, variant: CatalogVariant) -> Vec<CatalogItem> {
    let mut sorted = items.to_vec();

    match (key, variant) {
        (SortKey::PriceLow, _) => sorted.sort_by(|a, b| a.price.total_cmp(&b.price)),
        (SortKey::PriceHigh, _) => sorted.sort_by(|a, b| b.price.total_cmp(&a.price)),
        (SortKey::Rating, _) => sorted.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        // 静的カタログでは投稿日がないのでレビュー数で代用
        (SortKey::Newest, CatalogVariant::Static) => {
            sorted.sort_by(|a, b| b.review_count.cmp(&a.review_count))
        }
        // API の返却順をそのまま使う
        (SortKey::Newest, CatalogVariant::Dynamic) => {}
        (SortKey::Featured, CatalogVariant::Static) => {}
        // おすすめ商品を先頭へ（安定パーティション）
        (SortKey::Featured, CatalogVariant::Dynamic) => sorted.sort_by_key(|item| !item.is_featured),
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::item;

    fn ids(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("price-low".parse::<SortKey>().unwrap(), SortKey::PriceLow);
        assert_eq!("newest".parse::<SortKey>().unwrap(), SortKey::Newest);
        assert_eq!(
            "cheapest".parse::<SortKey>().unwrap_err(),
            CatalogError::UnknownSortKey("cheapest".into())
        );
        assert_eq!(serde_json::to_string(&SortKey::PriceHigh).unwrap(), "\"price-high\"");
    }

    #[test]
    fn price_sorts_are_stable_for_ties() {
        let items = vec![item("a", 20.0, 1.0), item("b", 10.0, 1.0), item("c", 20.0, 1.0), item("d", 10.0, 1.0)];

        let low = sort_items(&items, SortKey::PriceLow, CatalogVariant::Static);
        assert_eq!(ids(&low), vec!["b", "d", "a", "c"]);

        let high = sort_items(&items, SortKey::PriceHigh, CatalogVariant::Static);
        assert_eq!(ids(&high), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn rating_sort_is_descending() {
        let items = vec![item("a", 1.0, 3.0), item("b", 1.0, 4.8), item("c", 1.0, 4.1)];
        let sorted = sort_items(&items, SortKey::Rating, CatalogVariant::Dynamic);
        assert_eq!(ids(&sorted), vec!["b", "c", "a"]);
    }

    #[test]
    fn newest_depends_on_variant() {
        let mut a = item("a", 1.0, 1.0);
        a.review_count = 5;
        let mut b = item("b", 1.0, 1.0);
        b.review_count = 500;
        let items = vec![a, b];

        let by_reviews = sort_items(&items, SortKey::Newest, CatalogVariant::Static);
        assert_eq!(ids(&by_reviews), vec!["b", "a"]);

        let natural = sort_items(&items, SortKey::Newest, CatalogVariant::Dynamic);
        assert_eq!(ids(&natural), vec!["a", "b"]);
    }

    #[test]
    fn featured_is_stable_partition_in_dynamic_variant() {
        let mut items: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|id| item(id, 1.0, 1.0)).collect();
        items[1].is_featured = true;
        items[3].is_featured = true;

        let dynamic = sort_items(&items, SortKey::Featured, CatalogVariant::Dynamic);
        assert_eq!(ids(&dynamic), vec!["b", "d", "a", "c", "e"]);

        let fixed = sort_items(&items, SortKey::Featured, CatalogVariant::Static);
        assert_eq!(ids(&fixed), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn input_is_not_mutated() {
        let items = vec![item("a", 3.0, 1.0), item("b", 1.0, 1.0)];
        let before = items.clone();
        let _ = sort_items(&items, SortKey::PriceLow, CatalogVariant::Static);
        assert_eq!(items, before);
    }
}
