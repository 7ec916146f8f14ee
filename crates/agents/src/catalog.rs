use std::collections::BTreeSet;

use snoozy_core::domain::product::{Product, ProductId};

/// Lightweight view of the catalog used for reference matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
}

impl ProductSummary {
    pub fn of(product: &Product) -> Self {
        Self { id: product.id.clone(), name: product.name.clone() }
    }
}

/// Resolves a customer's free-text reference ("Ultra Comfort", "the eco
/// mattress") to a catalog id. Matching precedence, first hit wins:
///
/// 1. exact id match (case-insensitive);
/// 2. exact full-name match (case-insensitive);
/// 3. the hyphen-normalized reference is contained in the id (spaces and
///    underscores become hyphens, a trailing `-mattress` is stripped);
/// 4. word overlap: at least half of the reference's tokens appear in the
///    product name.
///
/// An unresolvable reference is `None`, never an error.
#[derive(Clone, Debug, Default)]
pub struct ProductResolver {
    products: Vec<ProductSummary>,
}

impl ProductResolver {
    pub fn new(products: Vec<ProductSummary>) -> Self {
        Self { products }
    }

    pub fn from_products(products: &[Product]) -> Self {
        Self::new(products.iter().map(ProductSummary::of).collect())
    }

    pub fn product_names(&self) -> Vec<String> {
        self.products.iter().map(|product| product.name.clone()).collect()
    }

    pub fn resolve(&self, reference: &str) -> Option<&ProductSummary> {
        let normalized = reference.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }

        for product in &self.products {
            if product.id.0.to_ascii_lowercase() == normalized {
                return Some(product);
            }
        }

        for product in &self.products {
            if product.name.to_ascii_lowercase() == normalized {
                return Some(product);
            }
        }

        let kebab = normalized.replace([' ', '_'], "-");
        let kebab = kebab.strip_suffix("-mattress").unwrap_or(&kebab);
        for product in &self.products {
            if product.id.0.to_ascii_lowercase().contains(kebab) {
                return Some(product);
            }
        }

        let reference_words: BTreeSet<&str> = normalized.split_whitespace().collect();
        if reference_words.is_empty() {
            return None;
        }
        for product in &self.products {
            let name = product.name.to_ascii_lowercase();
            let name_words: BTreeSet<&str> = name.split_whitespace().collect();
            let overlap = reference_words.intersection(&name_words).count();
            if overlap * 2 >= reference_words.len() {
                return Some(product);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use snoozy_core::domain::product::ProductId;

    use super::{ProductResolver, ProductSummary};

    fn resolver() -> ProductResolver {
        let summary = |id: &str, name: &str| ProductSummary {
            id: ProductId(id.to_string()),
            name: name.to_string(),
        };
        ProductResolver::new(vec![
            summary("ultra-comfort-mattress", "Ultra Comfort Mattress"),
            summary("performance-sport", "Performance Sport Mattress"),
            summary("eco-green", "Eco Green Mattress"),
            summary("dream-sleep", "Dream Sleep Mattress"),
            summary("luxury-cloud", "Luxury Cloud Mattress"),
            summary("essential-plus", "Essential Plus Mattress"),
        ])
    }

    #[test]
    fn resolving_an_id_is_idempotent() {
        let resolver = resolver();
        for id in [
            "ultra-comfort-mattress",
            "performance-sport",
            "eco-green",
            "dream-sleep",
            "luxury-cloud",
            "essential-plus",
        ] {
            let resolved = resolver.resolve(id).expect("id should resolve to itself");
            assert_eq!(resolved.id.0, id);
        }
    }

    #[test]
    fn exact_name_match_ignores_case() {
        let resolver = resolver();
        let resolved = resolver.resolve("eco green mattress").expect("name should resolve");
        assert_eq!(resolved.id.0, "eco-green");
    }

    #[test]
    fn word_overlap_resolves_partial_names() {
        // "ultra comfort" shares 2/2 words with "Ultra Comfort Mattress" and
        // must not land on Essential Plus despite its similar shape.
        let resolver = resolver();
        let resolved = resolver.resolve("Ultra Comfort").expect("partial name should resolve");
        assert_eq!(resolved.id.0, "ultra-comfort-mattress");
    }

    #[test]
    fn kebab_containment_strips_the_mattress_suffix() {
        let resolver = resolver();
        let resolved = resolver.resolve("eco_green mattress").expect("should resolve");
        assert_eq!(resolved.id.0, "eco-green");

        let resolved = resolver.resolve("dream_sleep").expect("should resolve");
        assert_eq!(resolved.id.0, "dream-sleep");
    }

    #[test]
    fn unknown_and_empty_references_yield_none() {
        let resolver = resolver();
        assert!(resolver.resolve("cloud nine deluxe ortho supreme").is_none());
        assert!(resolver.resolve("").is_none());
        assert!(resolver.resolve("   ").is_none());
    }

    #[test]
    fn single_word_reference_needs_a_name_hit() {
        let resolver = resolver();
        // One token, present in one name's word set.
        let resolved = resolver.resolve("sport").expect("should resolve");
        assert_eq!(resolved.id.0, "performance-sport");
    }
}
