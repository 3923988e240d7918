use colored::Colorize;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement,
    Table,
};

use crate::analysis::{format_amount, SessionSummary};
use crate::error::FormulaError;
use crate::io::written_summary;
use crate::models::{FormulaCategory, Nutrient, ReferenceTable, Session};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn numeric(value: String) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

/// Format the nutrient summary table as a string.
pub fn format_summary_table(summary: &SessionSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Summary".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    if summary.rows.is_empty() {
        output.push_str("  No saved formulas yet.\n");
    } else {
        let mut table = new_table();
        let mut header = vec!["Name", "Volume (mL)"];
        header.extend(Nutrient::ALL.iter().map(|n| n.header()));
        table.set_header(header);

        for row in &summary.rows {
            let mut cells = vec![
                Cell::new(&row.formula_name),
                numeric(format_amount(row.volume)),
            ];
            cells.extend(Nutrient::ALL.iter().map(|n| numeric(row.display_value(*n))));
            table.add_row(cells);
        }

        let totals = &summary.totals;
        let mut footer = vec![
            Cell::new("Total"),
            numeric(format_amount(totals.volume)),
        ];
        footer.extend(
            Nutrient::ALL
                .iter()
                .map(|n| numeric(totals.display_value(*n))),
        );
        table.add_row(footer);

        output.push_str(&format!("{table}\n"));
    }

    output.push_str(&format!(
        "  Free water: {} mL (not included in volume)\n",
        format_amount(summary.totals.water_ml)
    ));
    output
}

/// Print the nutrient summary table.
pub fn print_summary_table(summary: &SessionSummary) {
    print!("{}", format_summary_table(summary));
}

/// Format the session's formula entries, one line per slot.
pub fn format_entry_list(session: &Session) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Formulas".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let mut table = new_table();
    table.set_header(vec!["#", "Type", "Subtype", "Quantity", "Status"]);

    for (i, entry) in session.entries().iter().enumerate() {
        let classification = entry.classify();
        let quantity = match entry.category {
            Some(category) => {
                let amount = entry.active_quantity().unwrap_or_default();
                format!("{} {}", format_amount(amount), category.dosing_unit().symbol())
            }
            None => String::new(),
        };
        let status = if classification.is_valid {
            "Saved"
        } else if entry.is_complete() {
            "Invalid quantity"
        } else {
            "Incomplete"
        };
        table.add_row(vec![
            Cell::new(format!("{}", i + 1)),
            Cell::new(entry.category.map(|c| c.label()).unwrap_or("-")),
            Cell::new(if entry.subtype.is_empty() {
                "-"
            } else {
                entry.subtype.as_str()
            }),
            numeric(quantity),
            Cell::new(status),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Print the session's formula entries.
pub fn print_entry_list(session: &Session) {
    print!("{}", format_entry_list(session));
}

/// Format the products selectable under each category.
pub fn format_subtype_table(table: &ReferenceTable, only: Option<FormulaCategory>) -> String {
    let mut output = String::new();
    let categories: Vec<FormulaCategory> = match only {
        Some(category) => vec![category],
        None => FormulaCategory::ALL.to_vec(),
    };

    for category in categories {
        output.push_str(&format!(
            "\n{}\n",
            format!(
                "{} ({}, dosed in {})",
                category.label(),
                category.legacy_code(),
                category.dosing_unit().symbol()
            )
            .bold()
            .green()
        ));

        let mut listing = new_table();
        listing.set_header(vec!["Subtype", "Product", "kcal/unit", "Displacement"]);
        for product in table.subtypes_for(category) {
            listing.add_row(vec![
                Cell::new(&product.key),
                Cell::new(&product.label),
                numeric(format_amount(product.coefficients.energy_kcal)),
                numeric(format_amount(product.coefficients.displacement)),
            ]);
        }
        output.push_str(&format!("{listing}\n"));
    }
    output
}

/// Print the products selectable under each category.
pub fn print_subtype_table(table: &ReferenceTable, only: Option<FormulaCategory>) {
    print!("{}", format_subtype_table(table, only));
}

/// Format the raw entry list under a "Written summary" heading.
pub fn format_written_summary(session: &Session) -> Result<String, FormulaError> {
    Ok(format!(
        "\n{}\n{}\n{}\n",
        "Written summary".bold().green(),
        "=".repeat(60),
        written_summary(session.entries())?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Calculator;
    use crate::models::{FormulaEntry, NutrientCoefficients, ReferenceProduct};

    fn sample_table() -> ReferenceTable {
        ReferenceTable::from_products(vec![
            ReferenceProduct {
                key: "breast_milk".to_string(),
                label: "Breast Milk".to_string(),
                category: Some(FormulaCategory::Milk),
                coefficients: NutrientCoefficients {
                    energy_kcal: 0.68,
                    protein_g: 0.015,
                    ..NutrientCoefficients::default()
                },
            },
            ReferenceProduct {
                key: "polycal".to_string(),
                label: "Polycal".to_string(),
                category: Some(FormulaCategory::Additive),
                coefficients: NutrientCoefficients {
                    energy_kcal: 3.84,
                    ..NutrientCoefficients::default()
                },
            },
        ])
        .unwrap()
    }

    fn sample_session() -> Session {
        Session::from_parts(
            vec![
                FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", 100.0),
                FormulaEntry::default(),
            ],
            45.0,
        )
        .unwrap()
    }

    #[test]
    fn test_format_summary_table_contains_headers() {
        let table = sample_table();
        let summary = Calculator::new(&table).summarize(&sample_session()).unwrap();
        let output = format_summary_table(&summary);
        assert!(output.contains("Summary"));
        assert!(output.contains("Name"));
        assert!(output.contains("Energy (kcal)"));
        assert!(output.contains("Na+ (mg)"));
    }

    #[test]
    fn test_format_summary_table_contains_rows_and_total() {
        let table = sample_table();
        let summary = Calculator::new(&table).summarize(&sample_session()).unwrap();
        let output = format_summary_table(&summary);
        assert!(output.contains("breast_milk"));
        assert!(output.contains("68.000"));
        assert!(output.contains("1.500"));
        assert!(output.contains("Total"));
        assert!(output.contains("Free water: 45.000 mL"));
    }

    #[test]
    fn test_format_summary_table_empty() {
        let table = sample_table();
        let summary = Calculator::new(&table).summarize(&Session::new()).unwrap();
        let output = format_summary_table(&summary);
        assert!(output.contains("No saved formulas yet."));
        assert!(!output.contains("Total"));
    }

    #[test]
    fn test_format_entry_list_statuses() {
        let session = sample_session().with_entry_added().unwrap();
        let output = format_entry_list(&session);
        assert!(output.contains("Formulas"));
        assert!(output.contains("Breast Milk") || output.contains("Milk"));
        assert!(output.contains("100.000 mL"));
        assert!(output.contains("Saved"));
        assert!(output.contains("Incomplete"));
    }

    #[test]
    fn test_format_subtype_table_for_one_category() {
        let output = format_subtype_table(&sample_table(), Some(FormulaCategory::Additive));
        assert!(output.contains("Additives (post-decant)"));
        assert!(output.contains("polycal"));
        assert!(!output.contains("breast_milk"));
    }

    #[test]
    fn test_format_subtype_table_all_categories() {
        let output = format_subtype_table(&sample_table(), None);
        assert!(output.contains("Liquid Pediatric"));
        assert!(output.contains("Powder"));
        assert!(output.contains("breast_milk"));
    }

    #[test]
    fn test_format_written_summary() {
        let output = format_written_summary(&sample_session()).unwrap();
        assert!(output.contains("Written summary"));
        assert!(output.contains(r#""subtype":"breast_milk""#));
    }
}
