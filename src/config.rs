use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::co2::Co2Settings;
use crate::error::ConfigError;
use crate::expand::CodePolicy;
use crate::models::logit::SolverSettings;
use crate::models::table::DisplaySettings;

/// Settings for one analysis run.
///
/// Stored as a JSON object on disk; every key is optional:
/// ```json
/// {
///   "code_policy": "strict",
///   "solver": { "tolerance": 1e-8, "max_iterations": 25 },
///   "co2": {
///     "hotel": "hotel 1",
///     "intervention": "Vegetarian Behavioural Intervention",
///     "daily_meal_rate": 40.0
///   },
///   "display": { "decimals": 2, "delimiter": ";" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub code_policy: CodePolicy,
    pub solver: SolverSettings,
    pub co2: Co2Settings,
    pub display: DisplaySettings,
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.delimiter()?;
        Ok(config)
    }

    /// Output delimiter as the byte the CSV writer expects.
    pub fn delimiter(&self) -> Result<u8, ConfigError> {
        match self.display.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::Delimiter(self.display.delimiter.clone())),
        }
    }
}
