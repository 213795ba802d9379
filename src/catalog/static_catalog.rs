//! Static catalog
//! デモ・フォールバック用の埋め込み商品データ
//!
//! カテゴリごとに固定スキーマのレコードを持つ。キーは文字列ではなく
//! `StaticCategory` で、slug との相互変換だけを文字列で扱う。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{discount_percent, CatalogItem};
use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaticCategory {
    Electronics,
    Fashion,
    HomeKitchen,
    Books,
    Sports,
}

/// 静的カタログの1レコード
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticProduct {
    pub id: &'static str,
    pub title: &'static str,
    pub brand: &'static str,
    pub price: f64,
    pub original_price: Option<f64>,
    pub rating: f64,
    pub review_count: i64,
    pub is_prime: bool,
    pub is_delivery_tomorrow: bool,
}

impl StaticProduct {
    pub fn to_item(&self, category: StaticCategory) -> CatalogItem {
        CatalogItem {
            id: self.id.to_string(),
            title: self.title.to_string(),
            price: self.price,
            original_price: self.original_price,
            rating: self.rating,
            review_count: self.review_count,
            brand: Some(self.brand.to_string()),
            discount: discount_percent(self.price, self.original_price),
            is_prime: self.is_prime,
            is_delivery_tomorrow: self.is_delivery_tomorrow,
            is_featured: false,
            category: Some(category.slug().to_string()),
            image_url: None,
        }
    }
}

impl StaticCategory {
    pub const ALL: [StaticCategory; 5] = [
        StaticCategory::Electronics,
        StaticCategory::Fashion,
        StaticCategory::HomeKitchen,
        StaticCategory::Books,
        StaticCategory::Sports,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            StaticCategory::Electronics => "electronics",
            StaticCategory::Fashion => "fashion",
            StaticCategory::HomeKitchen => "home-kitchen",
            StaticCategory::Books => "books",
            StaticCategory::Sports => "sports",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StaticCategory::Electronics => "Electronics",
            StaticCategory::Fashion => "Fashion",
            StaticCategory::HomeKitchen => "Home & Kitchen",
            StaticCategory::Books => "Books",
            StaticCategory::Sports => "Sports & Outdoors",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StaticCategory::Electronics => "Phones, laptops, audio and smart devices",
            StaticCategory::Fashion => "Clothing, shoes and accessories",
            StaticCategory::HomeKitchen => "Appliances, cookware and home essentials",
            StaticCategory::Books => "Bestsellers, textbooks and new releases",
            StaticCategory::Sports => "Fitness gear and outdoor equipment",
        }
    }

    pub fn products(&self) -> &'static [StaticProduct] {
        match self {
            StaticCategory::Electronics => ELECTRONICS,
            StaticCategory::Fashion => FASHION,
            StaticCategory::HomeKitchen => HOME_KITCHEN,
            StaticCategory::Books => BOOKS,
            StaticCategory::Sports => SPORTS,
        }
    }

    pub fn items(&self) -> Vec<CatalogItem> {
        self.products().iter().map(|p| p.to_item(*self)).collect()
    }
}

impl fmt::Display for StaticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for StaticCategory {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StaticCategory::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

// ========================================
// Data
// ========================================

const fn p(
    id: &'static str,
    title: &'static str,
    brand: &'static str,
    price: f64,
    original_price: Option<f64>,
    rating: f64,
    review_count: i64,
    is_prime: bool,
    is_delivery_tomorrow: bool,
) -> StaticProduct {
    StaticProduct {
        id,
        title,
        brand,
        price,
        original_price,
        rating,
        review_count,
        is_prime,
        is_delivery_tomorrow,
    }
}

static ELECTRONICS: &[StaticProduct] = &[
    p("el-001", "iPhone 15 Pro 128GB", "Apple", 999.0, Some(1099.0), 4.7, 15230, true, true),
    p("el-002", "MacBook Air 13-inch M3", "Apple", 1099.0, Some(1199.0), 4.8, 8421, true, false),
    p("el-003", "AirPods Pro (2nd generation)", "Apple", 189.99, Some(249.0), 4.6, 60412, true, true),
    p("el-004", "Galaxy S24 Ultra 256GB", "Samsung", 1199.99, Some(1299.99), 4.5, 9820, true, true),
    p("el-005", "Galaxy Tab S9 11-inch", "Samsung", 719.99, Some(799.99), 4.4, 3120, true, false),
    p("el-006", "WH-1000XM5 Wireless Headphones", "Sony", 328.0, Some(399.99), 4.6, 21544, true, true),
    p("el-007", "Bravia XR 55-inch 4K TV", "Sony", 1298.0, None, 4.5, 2210, false, false),
    p("el-008", "XPS 13 Laptop", "Dell", 949.0, Some(1099.0), 4.2, 1874, false, false),
    p("el-009", "UltraSharp 27 4K Monitor", "Dell", 579.99, Some(649.99), 4.5, 4402, true, false),
    p("el-010", "PowerCore 10000 Portable Charger", "Anker", 21.99, Some(29.99), 4.7, 118230, true, true),
    p("el-011", "Soundcore Life Q30 Headphones", "Anker", 79.99, None, 4.4, 45012, true, true),
    p("el-012", "Kindle Paperwhite 16GB", "Amazon", 149.99, Some(159.99), 4.7, 80931, true, true),
    p("el-013", "Echo Dot (5th Gen)", "Amazon", 49.99, None, 4.6, 150344, true, true),
    p("el-014", "Pixel 8 128GB", "Google", 699.0, Some(799.0), 4.3, 5611, true, false),
    p("el-015", "Nest Learning Thermostat", "Google", 249.0, None, 3.9, 30122, false, false),
];

static FASHION: &[StaticProduct] = &[
    p("fa-001", "Air Max 270 Running Shoes", "Nike", 150.0, Some(170.0), 4.6, 12003, true, true),
    p("fa-002", "Dri-FIT Training T-Shirt", "Nike", 25.0, Some(30.0), 4.5, 8120, true, true),
    p("fa-003", "Ultraboost Light Running Shoes", "Adidas", 190.0, None, 4.7, 6540, true, false),
    p("fa-004", "Essentials Fleece Hoodie", "Adidas", 55.0, Some(65.0), 4.4, 3388, true, true),
    p("fa-005", "501 Original Fit Jeans", "Levi's", 59.5, Some(79.5), 4.5, 40221, true, true),
    p("fa-006", "Trucker Denim Jacket", "Levi's", 98.0, None, 4.6, 9231, false, false),
    p("fa-007", "Classic Oxford Shirt", "Ralph Lauren", 110.0, Some(125.0), 4.3, 2114, false, false),
    p("fa-008", "Chuck Taylor All Star High Top", "Converse", 65.0, None, 4.7, 98004, true, true),
    p("fa-009", "Aviator Classic Sunglasses", "Ray-Ban", 163.0, Some(181.0), 4.8, 15040, true, false),
    p("fa-010", "Leather Crossbody Bag", "Coach", 228.0, Some(295.0), 4.4, 1733, false, false),
    p("fa-011", "Everyday Cotton Socks (6 Pack)", "Hanes", 12.99, None, 3.8, 55120, true, true),
];

static HOME_KITCHEN: &[StaticProduct] = &[
    p("hk-001", "Duo 7-in-1 Pressure Cooker 6 Qt", "Instant Pot", 89.99, Some(119.99), 4.7, 160032, true, true),
    p("hk-002", "Artisan Stand Mixer 5 Qt", "KitchenAid", 379.99, Some(449.99), 4.8, 22450, true, false),
    p("hk-003", "V15 Detect Cordless Vacuum", "Dyson", 649.99, Some(749.99), 4.5, 8120, true, false),
    p("hk-004", "Pure Cool Air Purifier", "Dyson", 399.99, None, 4.2, 5403, false, false),
    p("hk-005", "Vertuo Coffee and Espresso Maker", "Nespresso", 169.0, Some(209.0), 4.6, 30118, true, true),
    p("hk-006", "Cast Iron Skillet 12-inch", "Lodge", 29.9, None, 4.8, 130776, true, true),
    p("hk-007", "Professional Blender 1500W", "Ninja", 99.99, Some(129.99), 4.7, 60220, true, true),
    p("hk-008", "Air Fryer Max XL 5.5 Qt", "Ninja", 129.99, Some(169.99), 4.8, 48001, true, true),
    p("hk-009", "Egyptian Cotton Sheet Set Queen", "Brooklinen", 149.0, None, 4.4, 4012, false, false),
    p("hk-010", "Roomba j7+ Robot Vacuum", "iRobot", 599.99, Some(799.99), 4.1, 9021, true, false),
];

static BOOKS: &[StaticProduct] = &[
    p("bk-001", "The Rust Programming Language, 2nd Edition", "No Starch Press", 39.95, Some(49.99), 4.8, 3211, true, true),
    p("bk-002", "Designing Data-Intensive Applications", "O'Reilly", 44.99, Some(59.99), 4.8, 6120, true, true),
    p("bk-003", "Programming Rust, 2nd Edition", "O'Reilly", 49.99, Some(69.99), 4.7, 1402, true, false),
    p("bk-004", "Atomic Habits", "Penguin", 13.79, Some(27.0), 4.8, 120445, true, true),
    p("bk-005", "Project Hail Mary", "Ballantine", 15.3, Some(30.0), 4.7, 98231, true, true),
    p("bk-006", "The Pragmatic Programmer", "Addison-Wesley", 41.52, Some(54.99), 4.8, 7410, true, false),
    p("bk-007", "Dune", "Ace", 10.99, None, 4.6, 110322, true, true),
    p("bk-008", "Clean Code", "Prentice Hall", 37.5, Some(49.99), 4.5, 9822, false, false),
    p("bk-009", "The Midnight Library", "Viking", 14.29, Some(26.0), 4.2, 150012, true, true),
];

static SPORTS: &[StaticProduct] = &[
    p("sp-001", "SelectTech 552 Adjustable Dumbbells", "Bowflex", 429.0, Some(549.0), 4.7, 22100, false, false),
    p("sp-002", "Premium Yoga Mat 6mm", "Manduka", 129.0, None, 4.8, 8015, true, true),
    p("sp-003", "Forerunner 265 Running Watch", "Garmin", 449.99, None, 4.6, 3120, true, false),
    p("sp-004", "Edge 540 Bike Computer", "Garmin", 349.99, Some(399.99), 4.4, 1201, true, false),
    p("sp-005", "Wide Mouth Water Bottle 32 oz", "Hydro Flask", 44.95, None, 4.8, 90210, true, true),
    p("sp-006", "Half Dome 2 Tent", "REI", 229.0, Some(279.0), 4.5, 2544, false, false),
    p("sp-007", "Resistance Bands Set", "Fit Simplify", 11.99, Some(16.99), 4.5, 140002, true, true),
    p("sp-008", "Official Size Basketball", "Spalding", 29.99, None, 4.3, 18340, true, true),
    p("sp-009", "Tour Performance Golf Balls (12)", "Titleist", 54.99, None, 4.9, 7210, true, false),
];
