use serde::Serialize;

/// One product card from a seller listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingRecord {
    pub index: usize,
    pub name: String,
    pub url: String,
    pub title: String,
    pub price: String,
    pub location: String,
    pub date: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailFields>,
}

/// Fields only available on the item's own page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailFields {
    pub location_detail: String,
    pub details: String,
    pub price_list: String,
    pub description: String,
    pub additional: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SellerInfo {
    pub name: String,
    pub rating: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub total_products: usize,
    pub products: Vec<ListingRecord>,
    pub seller_info: SellerInfo,
}

impl ListingRecord {
    pub fn apply_details(&mut self, detail: DetailFields) {
        self.detail = Some(detail);
    }
}

impl SellerInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.rating.is_empty()
    }
}

impl ExtractionResult {
    pub fn new(products: Vec<ListingRecord>, seller_info: SellerInfo) -> Self {
        Self {
            total_products: products.len(),
            products,
            seller_info,
        }
    }

    /// Concatenate per-URL results in order. Indices are kept as-is, and the
    /// first non-empty seller wins.
    pub fn merge(results: impl IntoIterator<Item = ExtractionResult>) -> Self {
        let mut products = Vec::new();
        let mut seller_info = SellerInfo::default();

        for result in results {
            if seller_info.is_empty() && !result.seller_info.is_empty() {
                seller_info = result.seller_info;
            }
            products.extend(result.products);
        }

        Self::new(products, seller_info)
    }

    pub fn has_details(&self) -> bool {
        self.products.iter().any(|p| p.detail.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, name: &str) -> ListingRecord {
        ListingRecord {
            index,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn new_counts_products() {
        let r = ExtractionResult::new(vec![record(1, "a"), record(2, "b")], SellerInfo::default());
        assert_eq!(r.total_products, 2);
    }

    #[test]
    fn merge_keeps_indices_and_first_seller() {
        let first = ExtractionResult::new(vec![record(1, "a"), record(2, "b")], SellerInfo::default());
        let second = ExtractionResult::new(
            vec![record(1, "c")],
            SellerInfo { name: "Shop".into(), rating: "4,9".into() },
        );
        let third = ExtractionResult::new(
            vec![],
            SellerInfo { name: "Other".into(), rating: "5,0".into() },
        );

        let merged = ExtractionResult::merge([first, second, third]);
        assert_eq!(merged.total_products, 3);
        let indices: Vec<usize> = merged.products.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 1]);
        assert_eq!(merged.seller_info.name, "Shop");
    }

    #[test]
    fn details_flatten_into_json() {
        let mut r = record(1, "a");
        let plain = serde_json::to_value(&r).unwrap();
        assert!(plain.get("description").is_none());

        r.apply_details(DetailFields {
            description: "text".into(),
            ..Default::default()
        });
        let enriched = serde_json::to_value(&r).unwrap();
        assert_eq!(enriched["description"], "text");
        assert_eq!(enriched["price_list"], "");
    }
}
