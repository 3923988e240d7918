#![no_main]

use libfuzzer_sys::fuzz_target;
use renal_formula_calculator::io::{restore_session_from_bytes, session_from_json, session_to_json};
use renal_formula_calculator::models::ReferenceTable;

fuzz_target!(|data: &[u8]| {
    let table = ReferenceTable::new();
    if let Ok(restored) = restore_session_from_bytes(data, &table) {
        assert!(restored.session.plausible_entries() >= 1);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(session) = session_from_json(text) {
            let json = session_to_json(&session, false).expect("re-encode decoded session");
            let again = session_from_json(&json).expect("decode re-encoded session");
            assert_eq!(again, session);
        }
    }
});
