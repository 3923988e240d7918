use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::FormulaError;
use crate::models::{FormulaCategory, FormulaEntry, ReferenceTable, Session, MAX_ENTRIES};

const DATA_URI_PREFIX: &str = "data:application/json;base64,";

/// Exchange-format record of a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "plausibleEntries")]
    pub plausible_entries: usize,
    #[serde(rename = "lastSubmission")]
    pub last_submission: Vec<EntryRecord>,
    pub water: f64,
}

/// Exchange-format record of one entry. `type` is the legacy `"f1"`..`"f4"` code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(rename = "type")]
    pub type_code: String,
    pub subtype: String,
    #[serde(rename = "mL")]
    pub ml: f64,
    pub g: f64,
}

impl From<&FormulaEntry> for EntryRecord {
    fn from(entry: &FormulaEntry) -> Self {
        Self {
            type_code: entry
                .category
                .map(|c| c.legacy_code())
                .unwrap_or_default(),
            subtype: entry.subtype.clone(),
            ml: entry.volume_ml,
            g: entry.mass_g,
        }
    }
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            plausible_entries: session.plausible_entries(),
            last_submission: session.entries().iter().map(EntryRecord::from).collect(),
            water: session.water_ml(),
        }
    }
}

/// One field of an imported session that was missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{path}: {problem}")]
pub struct DecodeIssue {
    /// Location of the field, e.g. `lastSubmission[2].mL`
    pub path: String,
    pub problem: String,
}

impl DecodeIssue {
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            problem: "missing".to_string(),
        }
    }

    pub fn malformed(path: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            problem: problem.into(),
        }
    }
}

/// A session could not be decoded; lists every offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_issues(.issues))]
pub struct DecodeError {
    pub issues: Vec<DecodeIssue>,
}

impl DecodeError {
    fn single(issue: DecodeIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

fn join_issues(issues: &[DecodeIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of a lenient import: the session plus what had to be replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredSession {
    pub session: Session,
    /// Issues behind every entry that was replaced by an empty entry
    pub issues: Vec<DecodeIssue>,
}

fn decode_count(obj: &Map<String, Value>, issues: &mut Vec<DecodeIssue>) -> Option<usize> {
    const KEY: &str = "plausibleEntries";
    match obj.get(KEY) {
        None => {
            issues.push(DecodeIssue::missing(KEY));
            None
        }
        Some(value) => match value.as_u64() {
            Some(n) if n >= 1 && n as usize <= MAX_ENTRIES => Some(n as usize),
            _ => {
                issues.push(DecodeIssue::malformed(
                    KEY,
                    format!("expected an integer between 1 and {MAX_ENTRIES}, got {value}"),
                ));
                None
            }
        },
    }
}

fn decode_quantity(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<f64> {
    let field = format!("{path}.{key}");
    match obj.get(key) {
        None => {
            issues.push(DecodeIssue::missing(field));
            None
        }
        Some(value) => match value.as_f64() {
            // `+ 0.0` turns an imported -0 into 0.
            Some(n) if n.is_finite() && n >= 0.0 => Some(n + 0.0),
            _ => {
                issues.push(DecodeIssue::malformed(
                    field,
                    format!("expected a non-negative number, got {value}"),
                ));
                None
            }
        },
    }
}

fn decode_string<'v>(
    obj: &'v Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<&'v str> {
    let field = format!("{path}.{key}");
    match obj.get(key) {
        None => {
            issues.push(DecodeIssue::missing(field));
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            issues.push(DecodeIssue::malformed(
                field,
                format!("expected a string, got {other}"),
            ));
            None
        }
    }
}

/// Decode one exchange-format entry, appending any problems to `issues`.
fn decode_entry(value: &Value, path: &str, issues: &mut Vec<DecodeIssue>) -> Option<FormulaEntry> {
    let Some(obj) = value.as_object() else {
        issues.push(DecodeIssue::malformed(path, "expected an object"));
        return None;
    };

    let before = issues.len();
    let type_code = decode_string(obj, "type", path, issues);
    let subtype = decode_string(obj, "subtype", path, issues);
    let ml = decode_quantity(obj, "mL", path, issues);
    let g = decode_quantity(obj, "g", path, issues);

    let category = match type_code {
        Some("") | None => None,
        Some(code) => {
            let parsed = FormulaCategory::from_legacy_code(code);
            if parsed.is_none() {
                issues.push(DecodeIssue::malformed(
                    format!("{path}.type"),
                    format!("unknown formula type code '{code}'"),
                ));
            }
            parsed
        }
    };

    if issues.len() > before {
        return None;
    }

    Some(FormulaEntry {
        category,
        subtype: subtype.unwrap_or_default().to_string(),
        volume_ml: ml.unwrap_or_default(),
        mass_g: g.unwrap_or_default(),
    })
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, DecodeError> {
    value
        .as_object()
        .ok_or_else(|| DecodeError::single(DecodeIssue::malformed("$", "expected a JSON object")))
}

fn decode_water(obj: &Map<String, Value>, issues: &mut Vec<DecodeIssue>) -> Option<f64> {
    match obj.get("water") {
        None => {
            issues.push(DecodeIssue::missing("water"));
            None
        }
        Some(value) => match value.as_f64() {
            Some(w) if w.is_finite() && w >= 0.0 => Some(w + 0.0),
            _ => {
                issues.push(DecodeIssue::malformed(
                    "water",
                    format!("expected a non-negative number, got {value}"),
                ));
                None
            }
        },
    }
}

/// Strictly decode an exchange-format session.
///
/// Either every field is well-formed and a typed [`Session`] comes back, or
/// the error lists every missing or malformed field.
pub fn decode_session(value: &Value) -> Result<Session, DecodeError> {
    let obj = as_object(value)?;
    let mut issues = Vec::new();

    let count = decode_count(obj, &mut issues);
    let water = decode_water(obj, &mut issues);

    let mut entries = Vec::new();
    match obj.get("lastSubmission") {
        None => issues.push(DecodeIssue::missing("lastSubmission")),
        Some(Value::Array(items)) => {
            if let Some(n) = count {
                if items.len() != n {
                    issues.push(DecodeIssue::malformed(
                        "lastSubmission",
                        format!("expected {n} entries, found {}", items.len()),
                    ));
                }
            }
            for (i, item) in items.iter().enumerate() {
                if let Some(entry) = decode_entry(item, &format!("lastSubmission[{i}]"), &mut issues)
                {
                    entries.push(entry);
                }
            }
        }
        Some(_) => issues.push(DecodeIssue::malformed("lastSubmission", "expected an array")),
    }

    if !issues.is_empty() {
        return Err(DecodeError { issues });
    }

    Session::from_parts(entries, water.unwrap_or_default())
        .map_err(|e| DecodeError::single(DecodeIssue::malformed("$", e.to_string())))
}

/// Leniently restore an exchange-format session.
///
/// The top-level fields must all be present and well-formed, otherwise the
/// import is rejected. Each entry that cannot be decoded, or that names a
/// subtype missing from `table`, is replaced by an empty entry and the
/// reason is reported in [`RestoredSession::issues`].
pub fn restore_session(value: &Value, table: &ReferenceTable) -> Result<RestoredSession, DecodeError> {
    let obj = as_object(value)?;
    let mut top_issues = Vec::new();

    let count = decode_count(obj, &mut top_issues);
    let water = decode_water(obj, &mut top_issues);
    let submission = obj.get("lastSubmission");
    if submission.is_none() {
        top_issues.push(DecodeIssue::missing("lastSubmission"));
    }
    let (Some(count), Some(water), Some(submission)) = (count, water, submission) else {
        return Err(DecodeError { issues: top_issues });
    };

    let mut issues = Vec::new();
    let items = match submission {
        Value::Array(items) if items.len() == count => Some(items),
        Value::Array(items) => {
            issues.push(DecodeIssue::malformed(
                "lastSubmission",
                format!("expected {count} entries, found {}", items.len()),
            ));
            None
        }
        _ => {
            issues.push(DecodeIssue::malformed("lastSubmission", "expected an array"));
            None
        }
    };

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let path = format!("lastSubmission[{i}]");
        let decoded = items.and_then(|items| decode_entry(&items[i], &path, &mut issues));
        let entry = match decoded {
            Some(entry) if entry.subtype.is_empty() => entry,
            Some(entry) => match table.check_selectable(&entry) {
                Ok(()) => entry,
                Err(err) => {
                    let problem = match err {
                        FormulaError::UnknownSubtype(key) => format!("unknown subtype '{key}'"),
                        other => other.to_string(),
                    };
                    issues.push(DecodeIssue::malformed(format!("{path}.subtype"), problem));
                    warn!(index = i, subtype = %entry.subtype, "imported entry names a product it cannot use, using an empty entry");
                    FormulaEntry::default()
                }
            },
            None => {
                warn!(index = i, "imported entry could not be read, using an empty entry");
                FormulaEntry::default()
            }
        };
        entries.push(entry);
    }

    let session = Session::from_parts(entries, water)
        .map_err(|e| DecodeError::single(DecodeIssue::malformed("$", e.to_string())))?;
    debug!(
        entries = session.plausible_entries(),
        replaced = issues.len(),
        "restored session"
    );
    Ok(RestoredSession { session, issues })
}

/// Serialize a session to exchange-format JSON.
pub fn session_to_json(session: &Session, pretty: bool) -> Result<String, FormulaError> {
    let record = SessionRecord::from(session);
    let content = if pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };
    Ok(content)
}

/// Strictly parse exchange-format JSON text.
pub fn session_from_json(content: &str) -> Result<Session, FormulaError> {
    let value: Value = serde_json::from_str(content)?;
    Ok(decode_session(&value)?)
}

/// Encode a session as a downloadable `data:` URI.
pub fn session_to_data_uri(session: &Session) -> Result<String, FormulaError> {
    let json = session_to_json(session, false)?;
    Ok(format!(
        "{DATA_URI_PREFIX}{}",
        general_purpose::STANDARD.encode(json)
    ))
}

/// Decode a session from a `data:` URI produced by [`session_to_data_uri`].
pub fn session_from_data_uri(uri: &str) -> Result<Session, FormulaError> {
    let payload = uri.strip_prefix(DATA_URI_PREFIX).ok_or_else(|| {
        FormulaError::ParseError(format!("expected a URI starting with '{DATA_URI_PREFIX}'"))
    })?;
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| FormulaError::ParseError(format!("Invalid base64 payload: {e}")))?;
    let content = std::str::from_utf8(&bytes)
        .map_err(|e| FormulaError::ParseError(format!("Invalid UTF-8: {e}")))?;
    session_from_json(content)
}

/// Raw JSON dump of the entry list, as shown under "Written summary".
pub fn written_summary(entries: &[FormulaEntry]) -> Result<String, FormulaError> {
    let records: Vec<EntryRecord> = entries.iter().map(EntryRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

/// Read a session file, strictly.
pub fn read_session(path: impl AsRef<Path>) -> Result<Session, FormulaError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    session_from_json(&content)
}

/// Read a session from bytes, leniently, checking subtypes against `table`.
pub fn restore_session_from_bytes(
    data: &[u8],
    table: &ReferenceTable,
) -> Result<RestoredSession, FormulaError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| FormulaError::ParseError(format!("Invalid UTF-8: {e}")))?;
    let value: Value = serde_json::from_str(content)?;
    Ok(restore_session(&value, table)?)
}

/// Write a session file in the exchange format.
pub fn write_session(
    session: &Session,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), FormulaError> {
    std::fs::write(path.as_ref(), session_to_json(session, pretty)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientCoefficients, ReferenceProduct};
    use serde_json::json;

    fn sample_table() -> ReferenceTable {
        ReferenceTable::from_products(vec![
            ReferenceProduct {
                key: "breast_milk".to_string(),
                label: "Breast Milk".to_string(),
                category: Some(FormulaCategory::Milk),
                coefficients: NutrientCoefficients::default(),
            },
            ReferenceProduct {
                key: "polycal".to_string(),
                label: "Polycal".to_string(),
                category: Some(FormulaCategory::Additive),
                coefficients: NutrientCoefficients::default(),
            },
        ])
        .unwrap()
    }

    fn sample_session() -> Session {
        Session::from_parts(
            vec![
                FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", 120.5),
                FormulaEntry::default(),
                FormulaEntry::solid(FormulaCategory::Additive, "polycal", 4.25),
            ],
            80.0,
        )
        .unwrap()
    }

    #[test]
    fn test_export_shape() {
        let value: Value =
            serde_json::from_str(&session_to_json(&sample_session(), false).unwrap()).unwrap();
        assert_eq!(value["plausibleEntries"], 3);
        assert_eq!(value["water"], 80.0);
        assert_eq!(value["lastSubmission"][0]["type"], "f1");
        assert_eq!(value["lastSubmission"][0]["subtype"], "breast_milk");
        assert_eq!(value["lastSubmission"][0]["mL"], 120.5);
        assert_eq!(value["lastSubmission"][0]["g"], 0.0);
        assert_eq!(value["lastSubmission"][1]["type"], "");
        assert_eq!(value["lastSubmission"][2]["type"], "f4");
    }

    #[test]
    fn test_json_roundtrip_is_field_for_field() {
        let session = sample_session();
        let back = session_from_json(&session_to_json(&session, true).unwrap()).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_data_uri_roundtrip() {
        let session = sample_session();
        let uri = session_to_data_uri(&session).unwrap();
        assert!(uri.starts_with("data:application/json;base64,"));
        assert_eq!(session_from_data_uri(&uri).unwrap(), session);
    }

    #[test]
    fn test_data_uri_wrong_prefix() {
        let err = session_from_data_uri("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, FormulaError::ParseError(_)));
    }

    #[test]
    fn test_decode_reports_every_missing_top_level_key() {
        let err = decode_session(&json!({})).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["plausibleEntries", "water", "lastSubmission"]);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode_session(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.issues[0].path, "$");
    }

    #[test]
    fn test_decode_count_mismatch() {
        let value = json!({
            "plausibleEntries": 2,
            "water": 0,
            "lastSubmission": [{"type": "", "subtype": "", "mL": 0, "g": 0}]
        });
        let err = decode_session(&value).unwrap_err();
        assert!(err.to_string().contains("expected 2 entries, found 1"));
    }

    #[test]
    fn test_decode_reports_entry_fields() {
        let value = json!({
            "plausibleEntries": 1,
            "water": 10,
            "lastSubmission": [{"type": "f1", "mL": -3, "g": "lots"}]
        });
        let err = decode_session(&value).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "lastSubmission[0].subtype",
                "lastSubmission[0].mL",
                "lastSubmission[0].g"
            ]
        );
    }

    #[test]
    fn test_decode_unknown_type_code() {
        let value = json!({
            "plausibleEntries": 1,
            "water": 0,
            "lastSubmission": [{"type": "f7", "subtype": "x", "mL": 1, "g": 0}]
        });
        let err = decode_session(&value).unwrap_err();
        assert!(err.to_string().contains("unknown formula type code 'f7'"));
    }

    #[test]
    fn test_decode_rejects_zero_count_and_negative_water() {
        let value = json!({"plausibleEntries": 0, "water": -1, "lastSubmission": []});
        let err = decode_session(&value).unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_decode_rejects_huge_count() {
        let value = json!({"plausibleEntries": 1_000_000_000u64, "water": 0, "lastSubmission": []});
        let err = decode_session(&value).unwrap_err();
        assert_eq!(err.issues[0].path, "plausibleEntries");
    }

    #[test]
    fn test_restore_well_formed_session() {
        let session = sample_session();
        let value: Value =
            serde_json::from_str(&session_to_json(&session, false).unwrap()).unwrap();
        let restored = restore_session(&value, &sample_table()).unwrap();
        assert_eq!(restored.session, session);
        assert!(restored.issues.is_empty());
    }

    #[test]
    fn test_restore_rejects_missing_top_level_key() {
        let value = json!({"plausibleEntries": 1, "lastSubmission": []});
        let err = restore_session(&value, &sample_table()).unwrap_err();
        assert_eq!(err.issues, vec![DecodeIssue::missing("water")]);
    }

    #[test]
    fn test_restore_defaults_bad_entries() {
        let value = json!({
            "plausibleEntries": 3,
            "water": 15,
            "lastSubmission": [
                {"type": "f1", "subtype": "breast_milk", "mL": 60, "g": 0},
                {"type": "f1", "subtype": "breast_milk"},
                {"type": "f3", "subtype": "unheard_of", "mL": 0, "g": 9}
            ]
        });
        let restored = restore_session(&value, &sample_table()).unwrap();
        let entries = restored.session.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            FormulaEntry::liquid(FormulaCategory::Milk, "breast_milk", 60.0)
        );
        assert_eq!(entries[1], FormulaEntry::default());
        assert_eq!(entries[2], FormulaEntry::default());
        assert_eq!(restored.session.water_ml(), 15.0);
        assert!(restored
            .issues
            .iter()
            .any(|i| i.path == "lastSubmission[1].mL"));
        assert!(restored
            .issues
            .iter()
            .any(|i| i.problem.contains("unknown subtype 'unheard_of'")));
    }

    #[test]
    fn test_restore_count_mismatch_defaults_every_entry() {
        let value = json!({
            "plausibleEntries": 2,
            "water": 0,
            "lastSubmission": [{"type": "f1", "subtype": "breast_milk", "mL": 60, "g": 0}]
        });
        let restored = restore_session(&value, &sample_table()).unwrap();
        assert_eq!(restored.session.plausible_entries(), 2);
        assert!(restored
            .session
            .entries()
            .iter()
            .all(|e| *e == FormulaEntry::default()));
        assert_eq!(restored.issues.len(), 1);
    }

    #[test]
    fn test_written_summary_uses_exchange_shape() {
        let summary = written_summary(sample_session().entries()).unwrap();
        assert!(summary.starts_with('['));
        assert!(summary.contains(r#""type":"f1""#));
        assert!(summary.contains(r#""mL":120.5"#));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rfc_session.json");
        let session = sample_session();
        write_session(&session, &path, true).unwrap();
        assert_eq!(read_session(&path).unwrap(), session);
    }

    #[test]
    fn test_roundtrip_at_entry_limit() {
        let full = Session::from_parts(vec![FormulaEntry::default(); MAX_ENTRIES], 0.0).unwrap();
        let back = session_from_json(&session_to_json(&full, false).unwrap()).unwrap();
        assert_eq!(back, full);
        assert!(full.with_entry_added().is_err());
    }

    #[test]
    fn test_decode_rejects_count_over_limit() {
        let entry = json!({"type": "", "subtype": "", "mL": 0, "g": 0});
        let value = json!({
            "plausibleEntries": MAX_ENTRIES + 1,
            "water": 0,
            "lastSubmission": vec![entry; MAX_ENTRIES + 1]
        });
        let err = decode_session(&value).unwrap_err();
        assert_eq!(err.issues[0].path, "plausibleEntries");
    }

    #[test]
    fn test_negative_zero_quantities_are_normalised() {
        let value = json!({
            "plausibleEntries": 1,
            "water": -0.0,
            "lastSubmission": [{"type": "f1", "subtype": "breast_milk", "mL": -0.0, "g": 0}]
        });
        let session = decode_session(&value).unwrap();
        assert!(session.entries()[0].volume_ml.is_sign_positive());
        assert!(session.water_ml().is_sign_positive());
    }

    #[test]
    fn test_restore_rejects_product_from_other_category() {
        let value = json!({
            "plausibleEntries": 1,
            "water": 0,
            "lastSubmission": [{"type": "f3", "subtype": "breast_milk", "mL": 0, "g": 5}]
        });
        let restored = restore_session(&value, &sample_table()).unwrap();
        assert_eq!(restored.session.entries()[0], FormulaEntry::default());
        assert_eq!(restored.issues.len(), 1);
        assert_eq!(restored.issues[0].path, "lastSubmission[0].subtype");
        assert!(restored.issues[0].problem.contains("is a Milk product, not Powder"));
    }

    #[test]
    fn test_decode_error_display_joins_issues() {
        let err = DecodeError {
            issues: vec![
                DecodeIssue::missing("water"),
                DecodeIssue::malformed(
                    "lastSubmission[0].mL",
                    "expected a non-negative number, got -1",
                ),
            ],
        };
        assert_eq!(
            err.to_string(),
            "water: missing; lastSubmission[0].mL: expected a non-negative number, got -1"
        );
    }

    #[test]
    fn test_restore_from_bytes_invalid_utf8() {
        let err = restore_session_from_bytes(&[0xff, 0xfe], &sample_table()).unwrap_err();
        assert!(err.to_string().contains("Invalid UTF-8"));
    }
}
