use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::error::FormulaError;
use crate::models::{FormulaEntry, Nutrient, NutrientAmounts, ReferenceTable};

/// The computed nutrient breakdown for one formula entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedRow {
    /// Position among the complete entries, starting at 0
    pub id: usize,
    /// Subtype key of the product
    pub formula_name: String,
    /// Effective volume, including displacement from mixed-in solids
    pub volume: f64,
    /// Nutrient amounts for the active quantity
    pub amounts: NutrientAmounts,
}

/// Render a value with exactly three decimals, never in scientific notation.
/// Negative zero renders as `0.000`.
pub fn format_amount(value: f64) -> String {
    format!("{:.3}", value + 0.0)
}

impl ComputedRow {
    /// Three-decimal rendering of one nutrient.
    pub fn display_value(&self, nutrient: Nutrient) -> String {
        format_amount(self.amounts.get(nutrient))
    }
}

impl Serialize for ComputedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + Nutrient::ALL.len()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("formula_name", &self.formula_name)?;
        map.serialize_entry("volume", &self.volume)?;
        for nutrient in Nutrient::ALL {
            map.serialize_entry(nutrient.field_name(), &self.display_value(nutrient))?;
        }
        map.end()
    }
}

/// Compute one row from a complete entry.
pub fn compute_row(
    id: usize,
    entry: &FormulaEntry,
    table: &ReferenceTable,
) -> Result<ComputedRow, FormulaError> {
    let is_liquid = entry.classify().is_liquid;
    let product = table.get(&entry.subtype)?;
    let coefficients = &product.coefficients;

    let active = if is_liquid {
        entry.volume_ml
    } else {
        entry.mass_g
    };

    let mut volume = active;
    if is_liquid && coefficients.displacement > 0.0 {
        volume *= 1.0 + coefficients.displacement;
    }

    Ok(ComputedRow {
        id,
        formula_name: entry.subtype.clone(),
        volume,
        amounts: coefficients.scaled(active),
    })
}

/// Compute the summary rows for an ordered list of entries.
///
/// Entries without a category or subtype are skipped. Row ids count only
/// the entries that were kept, so they are always `0..rows.len()`.
///
/// # Examples
///
/// ```
/// use renal_formula_calculator::analysis::compute_rows;
/// use renal_formula_calculator::models::{
///     FormulaCategory, FormulaEntry, NutrientCoefficients, ReferenceProduct, ReferenceTable,
/// };
///
/// let table = ReferenceTable::from_products(vec![ReferenceProduct {
///     key: "breast_milk".into(),
///     label: "Breast Milk".into(),
///     category: Some(FormulaCategory::Milk),
///     coefficients: NutrientCoefficients { energy_kcal: 0.68, ..Default::default() },
/// }])
/// .unwrap();
///
/// let entries = vec![
///     FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", 100.0),
///     FormulaEntry::default(),
/// ];
/// let rows = compute_rows(&entries, &table).unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].display_value(renal_formula_calculator::models::Nutrient::Energy), "68.000");
/// ```
pub fn compute_rows(
    entries: &[FormulaEntry],
    table: &ReferenceTable,
) -> Result<Vec<ComputedRow>, FormulaError> {
    let complete: Vec<&FormulaEntry> = entries.iter().filter(|e| e.is_complete()).collect();
    if complete.len() < entries.len() {
        debug!(
            skipped = entries.len() - complete.len(),
            "skipping incomplete formula entries"
        );
    }

    complete
        .into_iter()
        .enumerate()
        .map(|(id, entry)| compute_row(id, entry, table))
        .collect()
}
