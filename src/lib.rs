pub mod analysis;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod visualization;

pub use analysis::{Calculator, SessionSummary};
pub use config::CalculatorConfig;
pub use error::FormulaError;
pub use io::{ReferenceReader, SessionReader, SessionWriter};
pub use models::{
    FormulaCategory, FormulaEntry, Nutrient, NutrientCoefficients, ReferenceProduct,
    ReferenceTable, Session,
};
