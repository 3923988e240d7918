use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::category::FormulaCategory;
use super::entry::FormulaEntry;
use super::nutrient::NutrientCoefficients;
use crate::error::FormulaError;

/// One product in the nutrient reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProduct {
    /// Lookup key, the snake-case form of the label
    pub key: String,
    /// Product name as shown to the user
    pub label: String,
    /// Category the product is offered under, if restricted to one
    #[serde(default)]
    pub category: Option<FormulaCategory>,
    pub coefficients: NutrientCoefficients,
}

/// Read-only mapping from subtype key to per-unit nutrient coefficients.
///
/// Products keep the order they were loaded in, which is the order the
/// subtype choices are listed.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    products: Vec<ReferenceProduct>,
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting duplicate keys.
    pub fn from_products(
        products: impl IntoIterator<Item = ReferenceProduct>,
    ) -> Result<Self, FormulaError> {
        let mut table = Self::new();
        for product in products {
            table.insert(product)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, product: ReferenceProduct) -> Result<(), FormulaError> {
        if self.index.contains_key(&product.key) {
            return Err(FormulaError::ParseError(format!(
                "Duplicate reference product key '{}' (from '{}')",
                product.key, product.label
            )));
        }
        self.index.insert(product.key.clone(), self.products.len());
        self.products.push(product);
        Ok(())
    }

    /// Look up a product. A missing key means the caller let an unknown
    /// subtype through, so it is reported rather than defaulted.
    pub fn get(&self, key: &str) -> Result<&ReferenceProduct, FormulaError> {
        self.index
            .get(key)
            .map(|&i| &self.products[i])
            .ok_or_else(|| FormulaError::UnknownSubtype(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[ReferenceProduct] {
        &self.products
    }

    /// Products selectable under `category`. Products without a category
    /// are offered under every category.
    pub fn subtypes_for(&self, category: FormulaCategory) -> Vec<&ReferenceProduct> {
        self.products
            .iter()
            .filter(|p| p.category.map_or(true, |c| c == category))
            .collect()
    }

    /// Check that an entry names a product that can actually be selected
    /// for its category.
    pub fn check_selectable(&self, entry: &FormulaEntry) -> Result<(), FormulaError> {
        let product = self.get(&entry.subtype)?;
        match (entry.category, product.category) {
            (Some(chosen), Some(expected)) if chosen != expected => {
                Err(FormulaError::ValidationError(format!(
                    "'{}' is a {} product, not {}",
                    product.label, expected, chosen
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Turn a product name into its lookup key.
///
/// Parentheses are dropped, hyphens become spaces, and word boundaries are
/// inserted before runs of capitals and before capitalised words; the
/// resulting words are lowercased and joined with underscores.
/// `"NeoSure (22 kcal)"` becomes `"neo_sure_22_kcal"`.
pub fn subtype_key(name: &str) -> String {
    let cleaned: Vec<char> = name
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == '-' { ' ' } else { c })
        .collect();

    // Space before every run of capitals.
    let mut spaced = Vec::with_capacity(cleaned.len() * 2);
    for (i, &c) in cleaned.iter().enumerate() {
        if c.is_ascii_uppercase() && (i == 0 || !cleaned[i - 1].is_ascii_uppercase()) {
            spaced.push(' ');
        }
        spaced.push(c);
    }

    // Space before every capital followed by lowercase letters.
    let mut words = String::with_capacity(spaced.len() * 2);
    let mut i = 0;
    while i < spaced.len() {
        let c = spaced[i];
        if c.is_ascii_uppercase() && spaced.get(i + 1).is_some_and(|n| n.is_ascii_lowercase()) {
            words.push(' ');
            words.push(c);
            i += 1;
            while i < spaced.len() && spaced[i].is_ascii_lowercase() {
                words.push(spaced[i]);
                i += 1;
            }
        } else {
            words.push(c);
            i += 1;
        }
    }

    words
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
