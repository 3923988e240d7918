use thiserror::Error;

use crate::io::DecodeError;

/// Errors that can occur while computing formula nutrition.
#[derive(Error, Debug)]
pub enum FormulaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown subtype '{0}': not present in the reference table")]
    UnknownSubtype(String),

    #[error("Session decode error: {0}")]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DecodeIssue;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = FormulaError::from(io_err);
        let msg = err.to_string();
        assert!(msg.contains("IO error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = FormulaError::ParseError("bad category code".to_string());
        assert_eq!(err.to_string(), "Parse error: bad category code");
    }

    #[test]
    fn test_validation_error_display() {
        let err = FormulaError::ValidationError("water must be non-negative".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: water must be non-negative"
        );
    }

    #[test]
    fn test_unknown_subtype_display() {
        let err = FormulaError::UnknownSubtype("mystery_milk".to_string());
        assert!(err.to_string().contains("mystery_milk"));
        assert!(err.to_string().contains("reference table"));
    }

    #[test]
    fn test_json_error_from_conversion() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("not valid json{{{");
        let json_err = result.unwrap_err();
        let err: FormulaError = json_err.into();
        assert!(matches!(err, FormulaError::Json(_)));
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_toml_error_from_conversion() {
        let result: Result<toml::Value, _> = toml::from_str("= = =");
        let err: FormulaError = result.unwrap_err().into();
        assert!(matches!(err, FormulaError::Toml(_)));
    }

    #[test]
    fn test_decode_error_from_conversion() {
        let decode = DecodeError {
            issues: vec![DecodeIssue::missing("water")],
        };
        let err: FormulaError = decode.into();
        assert!(matches!(err, FormulaError::Decode(_)));
        assert!(err.to_string().contains("water"));
    }
}
