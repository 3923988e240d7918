mod reference_io;
mod session_io;

use std::path::Path;

use crate::error::FormulaError;
use crate::models::{ReferenceTable, Session};

pub use reference_io::{
    read_reference_csv, read_reference_csv_from_bytes, read_reference_json,
    read_reference_json_from_bytes, write_reference_json,
};
pub use session_io::{
    decode_session, read_session, restore_session, restore_session_from_bytes,
    session_from_data_uri, session_from_json, session_to_data_uri, session_to_json,
    write_session, written_summary, DecodeError, DecodeIssue, EntryRecord, RestoredSession,
    SessionRecord,
};

/// Trait for loading the nutrient reference table from a file.
pub trait ReferenceReader {
    fn read_reference(&self, path: &Path) -> Result<ReferenceTable, FormulaError>;
}

/// Trait for reading a saved session from a file.
pub trait SessionReader {
    fn read_session(&self, path: &Path) -> Result<Session, FormulaError>;
}

/// Trait for writing a session to a file.
pub trait SessionWriter {
    fn write_session(&self, session: &Session, path: &Path) -> Result<(), FormulaError>;
}

/// CSV spreadsheet format (reference tables only).
pub struct CsvFormat;

impl ReferenceReader for CsvFormat {
    fn read_reference(&self, path: &Path) -> Result<ReferenceTable, FormulaError> {
        read_reference_csv(path)
    }
}

/// JSON format reader/writer.
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl ReferenceReader for JsonFormat {
    fn read_reference(&self, path: &Path) -> Result<ReferenceTable, FormulaError> {
        read_reference_json(path)
    }
}

impl SessionReader for JsonFormat {
    fn read_session(&self, path: &Path) -> Result<Session, FormulaError> {
        read_session(path)
    }
}

impl SessionWriter for JsonFormat {
    fn write_session(&self, session: &Session, path: &Path) -> Result<(), FormulaError> {
        write_session(session, path, self.pretty)
    }
}

/// Load a reference table, picking the format from the file extension.
pub fn read_reference(path: impl AsRef<Path>) -> Result<ReferenceTable, FormulaError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let reader: &dyn ReferenceReader = match ext.as_str() {
        "csv" => &CsvFormat,
        "json" => &JsonFormat { pretty: false },
        _ => {
            return Err(FormulaError::ParseError(format!(
                "Unsupported reference table format: .{ext}. Use .csv or .json"
            )))
        }
    };
    reader.read_reference(path)
}
