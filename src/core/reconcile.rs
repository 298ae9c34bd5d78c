use crate::domain::model::{
    Dataset, MergeKey, MergedArticleRecord, MergedReport, PricingRule, Stock, WarehouseItem,
    UNKNOWN,
};
use crate::utils::error::{EtlError, Result};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Combines two stock values. A `>N` bound is never summed: the first
/// warehouse's bound wins, then the second's. Missing sides count as zero.
pub fn merge_stock(first: Option<Stock>, second: Option<Stock>) -> Result<Stock> {
    let first = first.unwrap_or_default();
    let second = second.unwrap_or_default();

    match (first, second) {
        (bound @ Stock::AtLeast(_), _) | (_, bound @ Stock::AtLeast(_)) => Ok(bound),
        (Stock::Known(a), Stock::Known(b)) => a
            .checked_add(b)
            .map(Stock::Known)
            .ok_or_else(|| EtlError::processing(format!("Stock overflow: {} + {}", a, b))),
    }
}

/// Sale price from the higher of the two purchase prices.
pub fn merge_price(rule: &PricingRule, first: Option<i64>, second: Option<i64>) -> Result<i64> {
    let max_price = first.unwrap_or(0).max(second.unwrap_or(0));
    rule.apply(max_price)
        .ok_or_else(|| EtlError::processing(format!("Price overflow for {}", max_price)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    key: MergeKey,
    pricing: PricingRule,
}

impl Reconciler {
    pub fn new(key: MergeKey, pricing: PricingRule) -> Self {
        Self { key, pricing }
    }

    /// Re-indexes a dataset for the configured merge key.
    fn keyed<'a>(&self, dataset: &'a Dataset) -> Cow<'a, Dataset> {
        match self.key {
            MergeKey::SellerArticle => Cow::Borrowed(dataset),
            MergeKey::CanonicalArticle => {
                let mut rekeyed = Dataset::new();
                for item in dataset.values() {
                    if item.article.is_empty() {
                        tracing::warn!(
                            "Seller article {} has no canonical article, skipping",
                            item.seller_article
                        );
                        continue;
                    }
                    if let Some(previous) = rekeyed.insert(item.article.clone(), item.clone()) {
                        tracing::warn!(
                            "Canonical article {} shared by {} and {}, keeping the latter",
                            item.article,
                            previous.seller_article,
                            item.seller_article
                        );
                    }
                }
                Cow::Owned(rekeyed)
            }
        }
    }

    fn merge_one(
        &self,
        key: &str,
        first: Option<&WarehouseItem>,
        second: Option<&WarehouseItem>,
    ) -> Result<MergedArticleRecord> {
        // 名稱與品牌以第一個倉庫為準
        let described = first.or(second);

        Ok(MergedArticleRecord {
            article: key.to_string(),
            name: described.map_or_else(|| UNKNOWN.to_string(), |item| item.name.clone()),
            brand: described.map_or_else(|| UNKNOWN.to_string(), |item| item.brand.clone()),
            stock: merge_stock(first.map(|i| i.stock), second.map(|i| i.stock))?,
            price: merge_price(&self.pricing, first.map(|i| i.price), second.map(|i| i.price))?,
        })
    }

    /// Merges two warehouses over the union of their keys.
    pub fn reconcile(&self, first: &Dataset, second: &Dataset) -> Result<MergedReport> {
        let first = self.keyed(first);
        let second = self.keyed(second);

        let keys: BTreeSet<&String> = first.keys().chain(second.keys()).collect();

        let mut report = MergedReport::new();
        for key in keys {
            let record = self.merge_one(key, first.get(key), second.get(key))?;
            report.insert(key.clone(), record);
        }

        tracing::info!(
            "[+] Merged report ready: {} articles ({} + {} source rows)",
            report.len(),
            first.len(),
            second.len()
        );
        Ok(report)
    }
}

/// Merge with the production defaults (seller-article key, 300/×3/×2 tiers).
pub fn reconcile(first: &Dataset, second: &Dataset) -> Result<MergedReport> {
    Reconciler::default().reconcile(first, second)
}
