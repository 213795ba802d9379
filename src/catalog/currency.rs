//! 表示通貨
//! 価格は USD で保存し、一覧取得時に指定通貨へ換算する。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CatalogItem;
use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Inr,
    Jpy,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
            Currency::Jpy => "JPY",
        }
    }

    /// 1 USD あたりのレート（固定）
    pub fn rate_from_usd(&self) -> f64 {
        match self {
            Currency::Usd => 1.0,
            Currency::Eur => 0.92,
            Currency::Gbp => 0.79,
            Currency::Inr => 83.0,
            Currency::Jpy => 150.0,
        }
    }

    /// USD の金額を換算（小数2桁に丸め。JPY は整数）
    pub fn convert(&self, usd: f64) -> f64 {
        let value = usd * self.rate_from_usd();
        match self {
            Currency::Jpy => value.round(),
            _ => (value * 100.0).round() / 100.0,
        }
    }

    pub fn convert_item(&self, item: &CatalogItem) -> CatalogItem {
        let mut converted = item.clone();
        if *self != Currency::Usd {
            converted.price = self.convert(item.price);
            converted.original_price = item.original_price.map(|p| self.convert(p));
        }
        converted
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "INR" => Ok(Currency::Inr),
            "JPY" => Ok(Currency::Jpy),
            _ => Err(CatalogError::UnknownCurrency(s.to_string())),
        }
    }
}
