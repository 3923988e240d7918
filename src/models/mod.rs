mod category;
mod entry;
mod nutrient;
mod reference;
mod session;

pub use category::{DosingUnit, FormulaCategory};
pub use entry::{classify, Classification, FormulaEntry};
pub use nutrient::{Nutrient, NutrientAmounts, NutrientCoefficients};
pub use reference::{subtype_key, ReferenceProduct, ReferenceTable};
pub use session::{Session, MAX_ENTRIES};
