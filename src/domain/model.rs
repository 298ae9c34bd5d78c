use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 庫存「大於 N」的前綴字元，例如 `>50`
pub const SENTINEL_PREFIX: char = '>';

/// Merged records fall back to this when neither source has a name/brand.
pub const UNKNOWN: &str = "Unknown";

/// Stock quantity as exported by a warehouse.
///
/// Warehouses report either an exact count or a lower bound (`>50`). The
/// lower bound is never summed with anything; it is carried through the
/// merge and written back in its `>N` text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stock {
    Known(i64),
    AtLeast(i64),
}

impl Stock {
    pub const ZERO: Stock = Stock::Known(0);

    /// 解析 "10" 或 ">20"；其他內容回傳 None
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix(SENTINEL_PREFIX) {
            Some(bound) => bound.trim().parse().ok().map(Stock::AtLeast),
            None => raw.parse().ok().map(Stock::Known),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Stock::AtLeast(_))
    }
}

impl Default for Stock {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stock::Known(n) => write!(f, "{}", n),
            Stock::AtLeast(n) => write!(f, "{}{}", SENTINEL_PREFIX, n),
        }
    }
}

impl Serialize for Stock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Stock::Known(n) => serializer.serialize_i64(*n),
            Stock::AtLeast(_) => serializer.collect_str(self),
        }
    }
}

/// One article from one warehouse export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseItem {
    pub seller_article: String,
    pub article: String,
    pub brand: String,
    pub name: String,
    pub stock: Stock,
    pub price: i64,
}

/// 以 seller_article 為 key 的單一倉庫資料
pub type Dataset = BTreeMap<String, WarehouseItem>;

/// A normalized export together with the file it came from.
#[derive(Debug, Clone)]
pub struct SourceDataset {
    pub label: String,
    pub items: Dataset,
}

impl SourceDataset {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Both warehouses, in delivery order. Order matters: the first one wins
/// name/brand and sentinel tie-breaks.
#[derive(Debug, Clone)]
pub struct SourceDatasets {
    pub first: SourceDataset,
    pub second: SourceDataset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedArticleRecord {
    pub article: String,
    pub name: String,
    pub brand: String,
    pub stock: Stock,
    pub price: i64,
}

pub type MergedReport = BTreeMap<String, MergedArticleRecord>;

/// Which code the two warehouses are joined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKey {
    /// 各倉庫自己的 seller_article (原始行為)
    #[default]
    SellerArticle,
    CanonicalArticle,
}

impl std::str::FromStr for MergeKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seller_article" | "seller" => Ok(Self::SellerArticle),
            "canonical_article" | "canonical" | "article" => Ok(Self::CanonicalArticle),
            other => Err(format!(
                "unknown merge key '{}', expected seller_article or canonical_article",
                other
            )),
        }
    }
}

/// Markup tiers turning the highest purchase price into a sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingRule {
    pub threshold: i64,
    pub low_multiplier: i64,
    pub high_multiplier: i64,
}

impl Default for PricingRule {
    fn default() -> Self {
        Self {
            threshold: 300,
            low_multiplier: 3,
            high_multiplier: 2,
        }
    }
}

impl PricingRule {
    pub fn apply(&self, max_price: i64) -> Option<i64> {
        if max_price < self.threshold {
            max_price.checked_mul(self.low_multiplier)
        } else {
            max_price.checked_mul(self.high_multiplier)
        }
    }
}
