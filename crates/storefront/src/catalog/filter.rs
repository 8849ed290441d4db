//! Client-side catalog filtering.

use std::collections::BTreeSet;

use autoparts_core::Product;

/// Search and category filter applied to a product listing.
///
/// Blank values are ignored. When both are set a product must match both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name or the category.
    pub search: Option<String>,
    /// Case-insensitive exact category.
    pub category: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub fn new(search: Option<String>, category: Option<String>) -> Self {
        Self {
            search: normalize(search),
            category: normalize(category),
        }
    }

    /// Whether any criterion is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.search.is_some() || self.category.is_some()
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category = product.category.as_deref().map(str::to_lowercase);

        let matches_search = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            product.name.to_lowercase().contains(&needle)
                || category.as_deref().is_some_and(|c| c.contains(&needle))
        });

        let matches_category = self
            .category
            .as_deref()
            .is_none_or(|wanted| category.as_deref() == Some(wanted.to_lowercase().as_str()));

        matches_search && matches_category
    }

    /// The matching products, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Distinct category labels, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|p| p.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
