use serde::{Deserialize, Serialize};

/// The nutrients reported for every formula row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nutrient {
    Energy,
    Protein,
    Calcium,
    Phosphorus,
    Potassium,
    Sodium,
    Magnesium,
    Retinol,
    VitaminD,
    Carbohydrate,
    Fat,
}

impl Nutrient {
    /// All nutrients in table column order.
    pub const ALL: [Nutrient; 11] = [
        Nutrient::Energy,
        Nutrient::Protein,
        Nutrient::Calcium,
        Nutrient::Phosphorus,
        Nutrient::Potassium,
        Nutrient::Sodium,
        Nutrient::Magnesium,
        Nutrient::Retinol,
        Nutrient::VitaminD,
        Nutrient::Carbohydrate,
        Nutrient::Fat,
    ];

    fn position(&self) -> usize {
        *self as usize
    }

    /// Field name used in exported row records.
    pub fn field_name(&self) -> &'static str {
        match self {
            Nutrient::Energy => "kcal",
            Nutrient::Protein => "protein",
            Nutrient::Calcium => "calcium",
            Nutrient::Phosphorus => "phosphorus",
            Nutrient::Potassium => "kalium",
            Nutrient::Sodium => "sodium",
            Nutrient::Magnesium => "magnesium",
            Nutrient::Retinol => "retinol_iu",
            Nutrient::VitaminD => "vit_d_iu",
            Nutrient::Carbohydrate => "carb",
            Nutrient::Fat => "fat",
        }
    }

    /// Column header, including the unit.
    pub fn header(&self) -> &'static str {
        match self {
            Nutrient::Energy => "Energy (kcal)",
            Nutrient::Protein => "Protein (g)",
            Nutrient::Calcium => "Calcium (mg)",
            Nutrient::Phosphorus => "Phos (mg)",
            Nutrient::Potassium => "K+ (mg)",
            Nutrient::Sodium => "Na+ (mg)",
            Nutrient::Magnesium => "Magnesium (mg)",
            Nutrient::Retinol => "Retinol (IU)",
            Nutrient::VitaminD => "Vit D (IU)",
            Nutrient::Carbohydrate => "Carb (g)",
            Nutrient::Fat => "Fat (g)",
        }
    }
}

/// Per-unit nutrient coefficients for one reference product.
///
/// Each value is the amount of nutrient in one unit of the active quantity:
/// one millilitre for liquids, one gram for solids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientCoefficients {
    pub energy_kcal: f64,
    pub protein_g: f64,
    pub calcium_mg: f64,
    pub phosphorus_mg: f64,
    pub potassium_mg: f64,
    pub sodium_mg: f64,
    pub magnesium_mg: f64,
    pub retinol_iu: f64,
    pub vitamin_d_iu: f64,
    pub carbohydrate_g: f64,
    pub fat_g: f64,
    /// Extra effective volume per unit of liquid, from a mixed-in solid.
    #[serde(default)]
    pub displacement: f64,
}

impl NutrientCoefficients {
    pub fn per_unit(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Energy => self.energy_kcal,
            Nutrient::Protein => self.protein_g,
            Nutrient::Calcium => self.calcium_mg,
            Nutrient::Phosphorus => self.phosphorus_mg,
            Nutrient::Potassium => self.potassium_mg,
            Nutrient::Sodium => self.sodium_mg,
            Nutrient::Magnesium => self.magnesium_mg,
            Nutrient::Retinol => self.retinol_iu,
            Nutrient::VitaminD => self.vitamin_d_iu,
            Nutrient::Carbohydrate => self.carbohydrate_g,
            Nutrient::Fat => self.fat_g,
        }
    }

    /// Multiply every coefficient by `quantity`.
    pub fn scaled(&self, quantity: f64) -> NutrientAmounts {
        let mut amounts = NutrientAmounts::default();
        for nutrient in Nutrient::ALL {
            amounts.values[nutrient.position()] = self.per_unit(nutrient) * quantity;
        }
        amounts
    }
}

/// Absolute nutrient amounts, one per [`Nutrient`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutrientAmounts {
    values: [f64; 11],
}

impl NutrientAmounts {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        self.values[nutrient.position()]
    }

    pub fn add_assign(&mut self, other: &NutrientAmounts) {
        for (mine, theirs) in self.values.iter_mut().zip(other.values.iter()) {
            *mine += theirs;
        }
    }
}

impl std::ops::Index<Nutrient> for NutrientAmounts {
    type Output = f64;

    fn index(&self, nutrient: Nutrient) -> &f64 {
        &self.values[nutrient.position()]
    }
}
