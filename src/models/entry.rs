use serde::{Deserialize, Serialize};

use super::category::FormulaCategory;
use crate::error::FormulaError;

/// One formula line item: a product and how much of it is dosed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaEntry {
    /// Product category; `None` until the user picks one
    pub category: Option<FormulaCategory>,
    /// Reference table key of the chosen product; empty until chosen
    pub subtype: String,
    /// Volume in millilitres, used for liquid categories
    pub volume_ml: f64,
    /// Mass in grams, used for solid categories
    pub mass_g: f64,
}

/// Outcome of classifying an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub has_type: bool,
    pub is_liquid: bool,
    pub is_solid: bool,
    pub is_valid: bool,
}

/// Classify an entry as liquid- or solid-dosed and decide whether it may be saved.
pub fn classify(entry: &FormulaEntry) -> Classification {
    let has_type = entry.category.is_some();
    let is_liquid = entry.category.is_some_and(|c| c.is_liquid());
    let is_solid = entry.category.is_some_and(|c| c.is_solid());
    let is_valid = has_type
        && !entry.subtype.is_empty()
        && entry
            .active_quantity()
            .is_some_and(|q| q.is_finite() && q > 0.0);

    Classification {
        has_type,
        is_liquid,
        is_solid,
        is_valid,
    }
}

impl FormulaEntry {
    /// A liquid entry dosed by volume.
    pub fn liquid(category: FormulaCategory, subtype: impl Into<String>, volume_ml: f64) -> Self {
        Self {
            category: Some(category),
            subtype: subtype.into(),
            volume_ml,
            mass_g: 0.0,
        }
    }

    /// A solid entry dosed by mass.
    pub fn solid(category: FormulaCategory, subtype: impl Into<String>, mass_g: f64) -> Self {
        Self {
            category: Some(category),
            subtype: subtype.into(),
            volume_ml: 0.0,
            mass_g,
        }
    }

    pub fn classify(&self) -> Classification {
        classify(self)
    }

    /// Whether both category and subtype have been chosen.
    pub fn is_complete(&self) -> bool {
        self.category.is_some() && !self.subtype.is_empty()
    }

    /// The quantity that applies to this entry's category.
    pub fn active_quantity(&self) -> Option<f64> {
        self.category.map(|c| {
            if c.is_liquid() {
                self.volume_ml
            } else {
                self.mass_g
            }
        })
    }

    /// Check that the entry is ready to be saved. Returns
    /// `FormulaError::ValidationError` naming the first missing piece.
    pub fn validate(&self) -> Result<(), FormulaError> {
        let Some(category) = self.category else {
            return Err(FormulaError::ValidationError(
                "a formula category must be chosen".to_string(),
            ));
        };
        if self.subtype.is_empty() {
            return Err(FormulaError::ValidationError(format!(
                "a {} subtype must be chosen",
                category.label()
            )));
        }
        if !self.classify().is_valid {
            let (name, value) = if category.is_liquid() {
                ("volume (mL)", self.volume_ml)
            } else {
                ("mass (g)", self.mass_g)
            };
            return Err(FormulaError::ValidationError(format!(
                "{}: {name} must be positive, got {value}",
                self.subtype
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: Option<FormulaCategory>, subtype: &str, ml: f64, g: f64) -> FormulaEntry {
        FormulaEntry {
            category,
            subtype: subtype.to_string(),
            volume_ml: ml,
            mass_g: g,
        }
    }

    #[test]
    fn test_default_entry_is_empty() {
        let e = FormulaEntry::default();
        assert!(e.category.is_none());
        assert!(e.subtype.is_empty());
        assert_eq!(e.volume_ml, 0.0);
        assert_eq!(e.mass_g, 0.0);
        assert!(!e.is_complete());
    }

    #[test]
    fn test_classify_default_entry() {
        let c = classify(&FormulaEntry::default());
        assert!(!c.has_type);
        assert!(!c.is_liquid);
        assert!(!c.is_solid);
        assert!(!c.is_valid);
    }

    #[test]
    fn test_classify_liquid_categories() {
        for category in [FormulaCategory::Milk, FormulaCategory::LiquidPediatric] {
            let c = classify(&FormulaEntry::liquid(category, "breast_milk", 100.0));
            assert!(c.has_type);
            assert!(c.is_liquid);
            assert!(!c.is_solid);
            assert!(c.is_valid);
        }
    }

    #[test]
    fn test_classify_solid_categories() {
        for category in [FormulaCategory::Powder, FormulaCategory::Additive] {
            let c = classify(&FormulaEntry::solid(category, "polycal", 5.0));
            assert!(c.has_type);
            assert!(!c.is_liquid);
            assert!(c.is_solid);
            assert!(c.is_valid);
        }
    }

    #[test]
    fn test_liquid_ignores_mass() {
        let e = entry(Some(FormulaCategory::Milk), "breast_milk", 0.0, 50.0);
        assert_eq!(e.active_quantity(), Some(0.0));
        assert!(!e.classify().is_valid);
    }

    #[test]
    fn test_solid_ignores_volume() {
        let e = entry(Some(FormulaCategory::Powder), "similac_powder", 120.0, 0.0);
        assert_eq!(e.active_quantity(), Some(0.0));
        assert!(!e.classify().is_valid);
    }

    #[test]
    fn test_zero_quantity_is_not_valid() {
        let e = FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", 0.0);
        assert!(!e.classify().is_valid);
    }

    #[test]
    fn test_negative_quantity_is_not_valid() {
        let e = FormulaEntry::solid(FormulaCategory::Additive, "polycal", -2.0);
        assert!(!e.classify().is_valid);
    }

    #[test]
    fn test_non_finite_quantity_is_not_valid() {
        let e = FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", f64::NAN);
        assert!(!e.classify().is_valid);
        let e = FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", f64::INFINITY);
        assert!(!e.classify().is_valid);
    }

    #[test]
    fn test_missing_subtype_is_not_valid() {
        let e = FormulaEntry::liquid(FormulaCategory::Milk, "", 100.0);
        let c = e.classify();
        assert!(c.has_type);
        assert!(c.is_liquid);
        assert!(!c.is_valid);
    }

    #[test]
    fn test_no_active_quantity_without_category() {
        let e = entry(None, "breast_milk", 100.0, 10.0);
        assert_eq!(e.active_quantity(), None);
    }

    #[test]
    fn test_validate_ok() {
        let e = FormulaEntry::liquid(FormulaCategory::LiquidPediatric, "pediasure", 240.0);
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_category() {
        let err = FormulaEntry::default().validate().unwrap_err();
        assert!(err.to_string().contains("category must be chosen"));
    }

    #[test]
    fn test_validate_missing_subtype() {
        let e = FormulaEntry::solid(FormulaCategory::Powder, "", 5.0);
        let err = e.validate().unwrap_err();
        assert!(err.to_string().contains("Powder subtype must be chosen"));
    }

    #[test]
    fn test_validate_reports_active_quantity() {
        let e = FormulaEntry::solid(FormulaCategory::Additive, "polycal", 0.0);
        let err = e.validate().unwrap_err();
        assert!(err.to_string().contains("mass (g) must be positive"));

        let e = FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", -1.0);
        let err = e.validate().unwrap_err();
        assert!(err.to_string().contains("volume (mL) must be positive"));
    }

    #[test]
    fn test_entry_json_roundtrip() {
        let e = FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", 150.5);
        let json = serde_json::to_string(&e).unwrap();
        let back: FormulaEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
