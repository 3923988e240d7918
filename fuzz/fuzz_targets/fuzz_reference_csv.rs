#![no_main]

use libfuzzer_sys::fuzz_target;
use renal_formula_calculator::io::read_reference_csv_from_bytes;
use renal_formula_calculator::models::FormulaCategory;

fuzz_target!(|data: &[u8]| {
    if let Ok(table) = read_reference_csv_from_bytes(data) {
        for category in FormulaCategory::ALL {
            let _ = table.subtypes_for(category);
        }
        for product in table.products() {
            assert!(table.contains(&product.key));
        }
    }
});
