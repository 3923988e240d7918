use serde::{Deserialize, Serialize};

use crate::error::FormulaError;

/// Broad product category of a formula entry.
///
/// The category decides how an entry is dosed: milks and liquid pediatric
/// formulas by volume, powders and additives by mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormulaCategory {
    Milk,
    LiquidPediatric,
    Powder,
    Additive,
}

/// Unit in which an entry's active quantity is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DosingUnit {
    Millilitres,
    Grams,
}

impl DosingUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            DosingUnit::Millilitres => "mL",
            DosingUnit::Grams => "g",
        }
    }
}

impl FormulaCategory {
    pub const ALL: [FormulaCategory; 4] = [
        FormulaCategory::Milk,
        FormulaCategory::LiquidPediatric,
        FormulaCategory::Powder,
        FormulaCategory::Additive,
    ];

    /// Category number, 1 through 4.
    pub fn index(&self) -> u8 {
        match self {
            FormulaCategory::Milk => 1,
            FormulaCategory::LiquidPediatric => 2,
            FormulaCategory::Powder => 3,
            FormulaCategory::Additive => 4,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            1 => Some(FormulaCategory::Milk),
            2 => Some(FormulaCategory::LiquidPediatric),
            3 => Some(FormulaCategory::Powder),
            4 => Some(FormulaCategory::Additive),
            _ => None,
        }
    }

    /// Decode the exchange-format type code (`"f1"` .. `"f4"`).
    ///
    /// Only the second character is significant. Codes that are too short or
    /// whose second character is not a digit 1-4 carry no category.
    pub fn from_legacy_code(code: &str) -> Option<Self> {
        code.chars()
            .nth(1)
            .and_then(|c| c.to_digit(10))
            .and_then(Self::from_index)
    }

    /// Exchange-format type code for this category.
    pub fn legacy_code(&self) -> String {
        format!("f{}", self.index())
    }

    /// Label shown to the user when picking a category.
    pub fn label(&self) -> &'static str {
        match self {
            FormulaCategory::Milk => "Milk",
            FormulaCategory::LiquidPediatric => "Liquid Pediatric",
            FormulaCategory::Powder => "Powder",
            FormulaCategory::Additive => "Additives (post-decant)",
        }
    }

    pub fn is_liquid(&self) -> bool {
        matches!(self, FormulaCategory::Milk | FormulaCategory::LiquidPediatric)
    }

    pub fn is_solid(&self) -> bool {
        !self.is_liquid()
    }

    pub fn dosing_unit(&self) -> DosingUnit {
        if self.is_liquid() {
            DosingUnit::Millilitres
        } else {
            DosingUnit::Grams
        }
    }
}

impl std::fmt::Display for FormulaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for FormulaCategory {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "milk" | "1" | "f1" => Ok(FormulaCategory::Milk),
            "liquid-pediatric" | "liquid_pediatric" | "liquid pediatric" | "liquid" | "2"
            | "f2" => Ok(FormulaCategory::LiquidPediatric),
            "powder" | "3" | "f3" => Ok(FormulaCategory::Powder),
            "additive" | "additives" | "4" | "f4" => Ok(FormulaCategory::Additive),
            _ => Err(FormulaError::ParseError(format!(
                "Unknown formula category: '{s}'"
            ))),
        }
    }
}
