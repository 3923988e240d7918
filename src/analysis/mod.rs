mod calculator;
mod rows;
mod totals;

pub use calculator::{Calculator, SessionSummary};
pub use rows::{compute_row, compute_rows, format_amount, ComputedRow};
pub use totals::NutrientTotals;
