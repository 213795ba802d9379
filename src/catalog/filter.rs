//! Filter stage
//! 価格帯・ブランド・評価・カテゴリによる絞り込み

use std::collections::BTreeSet;

use super::CatalogItem;
use crate::error::CatalogError;

/// 評価の上限
pub const MAX_RATING: f64 = 5.0;

/// ユーザーが選択した絞り込み条件
///
/// 価格帯は常に `min <= max` を満たす。
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    price_range: (f64, f64),
    selected_brands: BTreeSet<String>,
    min_rating: f64,
    category: Option<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            price_range: (0.0, f64::MAX),
            selected_brands: BTreeSet::new(),
            min_rating: 0.0,
            category: None,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price_range(&self) -> (f64, f64) {
        self.price_range
    }

    pub fn selected_brands(&self) -> &BTreeSet<String> {
        &self.selected_brands
    }

    pub fn min_rating(&self) -> f64 {
        self.min_rating
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// 価格帯を設定（逆転した範囲・NaN は拒否）
    pub fn set_price_range(&mut self, min: f64, max: f64) -> Result<(), CatalogError> {
        // NaN もここで弾かれる
        if !(min <= max) {
            return Err(CatalogError::InvalidPriceRange { min, max });
        }
        self.price_range = (min, max);
        Ok(())
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Result<Self, CatalogError> {
        self.set_price_range(min, max)?;
        Ok(self)
    }

    pub fn set_min_rating(&mut self, rating: f64) -> Result<(), CatalogError> {
        if !(0.0..=MAX_RATING).contains(&rating) {
            return Err(CatalogError::InvalidRating(rating));
        }
        self.min_rating = rating;
        Ok(())
    }

    pub fn with_min_rating(mut self, rating: f64) -> Result<Self, CatalogError> {
        self.set_min_rating(rating)?;
        Ok(self)
    }

    /// ブランドの選択を切り替える。選択状態になった場合 true
    pub fn toggle_brand(&mut self, brand: &str) -> bool {
        if self.selected_brands.remove(brand) {
            false
        } else {
            self.selected_brands.insert(brand.to_string());
            true
        }
    }

    pub fn set_brands<I, S>(&mut self, brands: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_brands = brands
            .into_iter()
            .map(Into::into)
            .filter(|b: &String| !b.trim().is_empty())
            .collect();
    }

    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_brands(brands);
        self
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// すべての条件を初期値に戻す
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 全条件を満たすか
    pub fn matches(&self, item: &CatalogItem) -> bool {
        let (min, max) = self.price_range;
        if item.price < min || item.price > max {
            return false;
        }

        if !self.selected_brands.is_empty() {
            match &item.brand {
                Some(brand) if self.selected_brands.contains(brand) => {}
                _ => return false,
            }
        }

        if item.rating < self.min_rating {
            return false;
        }

        match (&self.category, &item.category) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted == actual,
            (Some(_), None) => false,
        }
    }
}

/// 条件を満たすアイテムだけを返す（入力は変更しない）
pub fn filter_items(items: &[CatalogItem], filters: &FilterState) -> Vec<CatalogItem> {
    items
        .iter()
        .filter(|item| filters.matches(item))
        .cloned()
        .collect()
}

/// コレクション中のブランド一覧（重複なし・昇順）。ブランド絞り込みの選択肢に使う
pub fn available_brands(items: &[CatalogItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.brand.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
