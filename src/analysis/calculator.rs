use serde::Serialize;

use crate::analysis::{compute_rows, ComputedRow, NutrientTotals};
use crate::error::FormulaError;
use crate::models::{classify, Classification, FormulaEntry, ReferenceTable, Session};

/// Rows and totals for one session, recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub rows: Vec<ComputedRow>,
    pub totals: NutrientTotals,
}

/// Unified calculation API over a fixed reference table.
pub struct Calculator<'a> {
    table: &'a ReferenceTable,
}

impl<'a> Calculator<'a> {
    /// Create a new Calculator backed by the given reference table.
    pub fn new(table: &'a ReferenceTable) -> Self {
        Self { table }
    }

    /// Classify a single entry.
    pub fn classify(&self, entry: &FormulaEntry) -> Classification {
        classify(entry)
    }

    /// Compute the summary rows for an entry list.
    pub fn rows(&self, entries: &[FormulaEntry]) -> Result<Vec<ComputedRow>, FormulaError> {
        compute_rows(entries, self.table)
    }

    /// Compute rows and totals for a whole session.
    pub fn summarize(&self, session: &Session) -> Result<SessionSummary, FormulaError> {
        let rows = self.rows(session.entries())?;
        let totals = NutrientTotals::from_rows(&rows, session.water_ml());
        Ok(SessionSummary { rows, totals })
    }

    /// Check an entry against the classifier and the reference table, then
    /// save it into the session at `index`.
    pub fn save_entry(
        &self,
        session: &Session,
        index: usize,
        entry: FormulaEntry,
    ) -> Result<Session, FormulaError> {
        entry.validate()?;
        self.table.check_selectable(&entry)?;
        session.with_entry_replaced(index, entry)
    }
}
