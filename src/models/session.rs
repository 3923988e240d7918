use super::entry::FormulaEntry;
use crate::error::FormulaError;

/// Most entry slots a session may hold, in memory and in the exchange format.
pub const MAX_ENTRIES: usize = 1000;

/// The working state of one calculation: the formula entries plus free water.
///
/// A session always holds at least one entry. Every change produces a new
/// session value; nothing is edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    entries: Vec<FormulaEntry>,
    /// Supplemental free water in millilitres
    water_ml: f64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            entries: vec![FormulaEntry::default()],
            water_ml: 0.0,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session from decoded parts.
    pub fn from_parts(entries: Vec<FormulaEntry>, water_ml: f64) -> Result<Self, FormulaError> {
        if entries.is_empty() {
            return Err(FormulaError::ValidationError(
                "a session needs at least one formula entry".to_string(),
            ));
        }
        check_entry_count(entries.len())?;
        check_water(water_ml)?;
        Ok(Self { entries, water_ml })
    }

    pub fn entries(&self) -> &[FormulaEntry] {
        &self.entries
    }

    pub fn water_ml(&self) -> f64 {
        self.water_ml
    }

    /// Number of entry slots, complete or not.
    pub fn plausible_entries(&self) -> usize {
        self.entries.len()
    }

    /// Append an empty entry slot. Fails once the session is full.
    pub fn with_entry_added(&self) -> Result<Self, FormulaError> {
        check_entry_count(self.entries.len() + 1)?;
        let mut entries = self.entries.clone();
        entries.push(FormulaEntry::default());
        Ok(Self {
            entries,
            water_ml: self.water_ml,
        })
    }

    /// Drop the most recently added entry. The first entry is never removed.
    pub fn with_last_entry_removed(&self) -> Self {
        let mut entries = self.entries.clone();
        if entries.len() > 1 {
            entries.pop();
        }
        Self {
            entries,
            water_ml: self.water_ml,
        }
    }

    /// Replace the entry at `index` with a saved entry.
    ///
    /// Only entries that classify as valid can be saved.
    pub fn with_entry_replaced(
        &self,
        index: usize,
        entry: FormulaEntry,
    ) -> Result<Self, FormulaError> {
        if index >= self.entries.len() {
            return Err(FormulaError::ValidationError(format!(
                "formula {} does not exist (session has {})",
                index + 1,
                self.entries.len()
            )));
        }
        entry.validate()?;
        let mut entries = self.entries.clone();
        entries[index] = entry;
        Ok(Self {
            entries,
            water_ml: self.water_ml,
        })
    }

    pub fn with_water(&self, water_ml: f64) -> Result<Self, FormulaError> {
        check_water(water_ml)?;
        Ok(Self {
            entries: self.entries.clone(),
            water_ml,
        })
    }
}

fn check_entry_count(count: usize) -> Result<(), FormulaError> {
    if count > MAX_ENTRIES {
        return Err(FormulaError::ValidationError(format!(
            "a session holds at most {MAX_ENTRIES} formulas"
        )));
    }
    Ok(())
}

fn check_water(water_ml: f64) -> Result<(), FormulaError> {
    if !water_ml.is_finite() || water_ml < 0.0 {
        return Err(FormulaError::ValidationError(format!(
            "water must be a non-negative number of mL, got {water_ml}"
        )));
    }
    Ok(())
}
