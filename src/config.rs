use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FormulaError;

/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "formula-calc.toml";

/// Session file used when neither the command line nor the config names one.
pub const DEFAULT_SESSION_FILE: &str = "rfc_session.json";

/// Settings for the command-line calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Nutrient reference table (.csv or .json)
    pub reference_table: Option<PathBuf>,
    /// Working session file
    pub session: PathBuf,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Pretty-print saved session files
    pub pretty_json: bool,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            reference_table: None,
            session: PathBuf::from(DEFAULT_SESSION_FILE),
            log_level: "warn".to_string(),
            pretty_json: true,
        }
    }
}

impl CalculatorConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, FormulaError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormulaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        // Relative paths in the file are relative to the file itself.
        if let Some(dir) = path.parent() {
            config.reference_table = config.reference_table.map(|p| resolve(dir, p));
            config.session = resolve(dir, config.session);
        }
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else the default file if it exists, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, FormulaError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

fn resolve(dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || dir.as_os_str().is_empty() {
        path
    } else {
        dir.join(path)
    }
}
