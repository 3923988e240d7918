use serde::Serialize;

use super::rows::{format_amount, ComputedRow};
use crate::models::{Nutrient, NutrientAmounts};

/// Column sums over the computed rows of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientTotals {
    pub row_count: usize,
    /// Sum of effective volumes; free water is not included
    pub volume: f64,
    pub amounts: NutrientAmounts,
    /// Free water carried alongside the formulas
    pub water_ml: f64,
}

impl NutrientTotals {
    pub fn from_rows(rows: &[ComputedRow], water_ml: f64) -> Self {
        let mut amounts = NutrientAmounts::default();
        let mut volume = 0.0;
        for row in rows {
            volume += row.volume;
            amounts.add_assign(&row.amounts);
        }
        Self {
            row_count: rows.len(),
            volume,
            amounts,
            water_ml,
        }
    }

    pub fn display_value(&self, nutrient: Nutrient) -> String {
        format_amount(self.amounts.get(nutrient))
    }
}

impl Serialize for NutrientTotals {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(3 + Nutrient::ALL.len()))?;
        map.serialize_entry("rows", &self.row_count)?;
        map.serialize_entry("volume", &format_amount(self.volume))?;
        map.serialize_entry("water", &self.water_ml)?;
        for nutrient in Nutrient::ALL {
            map.serialize_entry(nutrient.field_name(), &self.display_value(nutrient))?;
        }
        map.end()
    }
}
