use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::FormulaError;
use crate::models::{
    subtype_key, FormulaCategory, NutrientCoefficients, ReferenceProduct, ReferenceTable,
};

const NAME_COLUMN: &str = "Names (per mL)";

/// Spreadsheet columns that must be present in a reference CSV.
const REQUIRED_COLUMNS: [&str; 13] = [
    NAME_COLUMN,
    "Calories",
    "Protein",
    "Calcium",
    "Phos",
    "K+",
    "Na+",
    "Mg",
    "Retinol (IU)",
    "Vit D (IU)",
    "Carb",
    "Fat",
    "d/p",
];

/// CSV row structure for the nutrient spreadsheet.
#[derive(Debug, serde::Deserialize)]
struct ReferenceRow {
    #[serde(rename = "Names (per mL)")]
    name: String,
    #[serde(rename = "Type", default)]
    category: Option<String>,
    #[serde(rename = "Calories")]
    calories: Option<f64>,
    #[serde(rename = "Protein")]
    protein: Option<f64>,
    #[serde(rename = "Calcium")]
    calcium: Option<f64>,
    #[serde(rename = "Phos")]
    phosphorus: Option<f64>,
    #[serde(rename = "K+")]
    potassium: Option<f64>,
    #[serde(rename = "Na+")]
    sodium: Option<f64>,
    #[serde(rename = "Mg")]
    magnesium: Option<f64>,
    #[serde(rename = "Retinol (IU)")]
    retinol: Option<f64>,
    #[serde(rename = "Vit D (IU)")]
    vitamin_d: Option<f64>,
    #[serde(rename = "Carb")]
    carbohydrate: Option<f64>,
    #[serde(rename = "Fat")]
    fat: Option<f64>,
    #[serde(rename = "d/p")]
    displacement: Option<f64>,
}

/// Check that every coefficient is a finite, non-negative number.
fn check_coefficients(label: &str, c: &NutrientCoefficients) -> Result<(), FormulaError> {
    let values = [
        ("Calories", c.energy_kcal),
        ("Protein", c.protein_g),
        ("Calcium", c.calcium_mg),
        ("Phos", c.phosphorus_mg),
        ("K+", c.potassium_mg),
        ("Na+", c.sodium_mg),
        ("Mg", c.magnesium_mg),
        ("Retinol (IU)", c.retinol_iu),
        ("Vit D (IU)", c.vitamin_d_iu),
        ("Carb", c.carbohydrate_g),
        ("Fat", c.fat_g),
        ("d/p", c.displacement),
    ];
    for (column, value) in values {
        if !value.is_finite() || value < 0.0 {
            return Err(FormulaError::ValidationError(format!(
                "{label}: {column} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}

fn row_to_product(row: ReferenceRow, line: usize) -> Result<ReferenceProduct, FormulaError> {
    let label = row.name.trim().to_string();
    if label.is_empty() {
        return Err(FormulaError::ParseError(format!(
            "row {line}: product name is empty"
        )));
    }

    let category = match row.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(code.parse::<FormulaCategory>().map_err(|_| {
            FormulaError::ParseError(format!("row {line}: unknown product type '{code}'"))
        })?),
    };

    // Blank cells count as zero.
    let cell = |column: &str, value: Option<f64>| {
        value.unwrap_or_else(|| {
            warn!(product = %label, column, "empty reference cell, using 0");
            0.0
        })
    };

    let coefficients = NutrientCoefficients {
        energy_kcal: cell("Calories", row.calories),
        protein_g: cell("Protein", row.protein),
        calcium_mg: cell("Calcium", row.calcium),
        phosphorus_mg: cell("Phos", row.phosphorus),
        potassium_mg: cell("K+", row.potassium),
        sodium_mg: cell("Na+", row.sodium),
        magnesium_mg: cell("Mg", row.magnesium),
        retinol_iu: cell("Retinol (IU)", row.retinol),
        vitamin_d_iu: cell("Vit D (IU)", row.vitamin_d),
        carbohydrate_g: cell("Carb", row.carbohydrate),
        fat_g: cell("Fat", row.fat),
        displacement: cell("d/p", row.displacement),
    };
    check_coefficients(&label, &coefficients)?;

    Ok(ReferenceProduct {
        key: subtype_key(&label),
        label,
        category,
        coefficients,
    })
}

fn parse_reference_records<R: Read>(
    rdr: &mut csv::Reader<R>,
) -> Result<ReferenceTable, FormulaError> {
    let headers = rdr.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(FormulaError::ParseError(format!(
            "reference table is missing columns: {}",
            missing.join(", ")
        )));
    }

    let mut table = ReferenceTable::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let row: ReferenceRow = result?;
        // Header is line 1.
        table.insert(row_to_product(row, i + 2)?)?;
    }
    debug!(products = table.len(), "loaded reference table");
    Ok(table)
}

fn csv_reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Read the nutrient reference table from a CSV spreadsheet export.
pub fn read_reference_csv(path: impl AsRef<Path>) -> Result<ReferenceTable, FormulaError> {
    let mut rdr = csv_reader_builder().from_path(path.as_ref())?;
    parse_reference_records(&mut rdr)
}

/// Read the nutrient reference table from CSV bytes.
pub fn read_reference_csv_from_bytes(data: &[u8]) -> Result<ReferenceTable, FormulaError> {
    let mut rdr = csv_reader_builder().from_reader(data);
    parse_reference_records(&mut rdr)
}

/// Read the nutrient reference table from a JSON array of products.
pub fn read_reference_json(path: impl AsRef<Path>) -> Result<ReferenceTable, FormulaError> {
    let content = std::fs::read(path.as_ref())?;
    read_reference_json_from_bytes(&content)
}

/// Read the nutrient reference table from JSON bytes.
pub fn read_reference_json_from_bytes(data: &[u8]) -> Result<ReferenceTable, FormulaError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| FormulaError::ParseError(format!("Invalid UTF-8: {e}")))?;
    let products: Vec<ReferenceProduct> = serde_json::from_str(content)?;
    for product in &products {
        if product.key.is_empty() {
            return Err(FormulaError::ParseError(format!(
                "product '{}' has an empty key",
                product.label
            )));
        }
        check_coefficients(&product.label, &product.coefficients)?;
    }
    ReferenceTable::from_products(products)
}

/// Write the reference table as a JSON array of products.
pub fn write_reference_json(
    table: &ReferenceTable,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), FormulaError> {
    let content = if pretty {
        serde_json::to_string_pretty(table.products())?
    } else {
        serde_json::to_string(table.products())?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}
