//! Coefficient rows and their rounded display form.

use serde::{Deserialize, Serialize};

use super::distributions::Z_975;

/// How numbers are rendered in the exported tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub decimals: usize,
    pub pvalue_decimals: usize,
    /// p-values below this are written as `<floor`.
    pub pvalue_floor: f64,
    pub delimiter: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            decimals: 2,
            pvalue_decimals: 4,
            pvalue_floor: 0.0001,
            delimiter: ",".to_string(),
        }
    }
}

/// One estimated parameter at full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub parameter: String,
    /// Log-odds.
    pub coef: f64,
    pub se: f64,
    pub pvalue: f64,
}

impl CoefficientRow {
    pub fn new(parameter: impl Into<String>, coef: f64, se: f64, pvalue: f64) -> Self {
        Self {
            parameter: parameter.into(),
            coef,
            se,
            pvalue,
        }
    }

    /// Odds ratio.
    pub fn coef_exp(&self) -> f64 {
        self.coef.exp()
    }

    pub fn se_exp(&self) -> f64 {
        self.se.exp()
    }

    /// Wald interval on the log-odds scale, exponentiated.
    pub fn ci_exp(&self) -> (f64, f64) {
        (
            (self.coef - Z_975 * self.se).exp(),
            (self.coef + Z_975 * self.se).exp(),
        )
    }

    pub fn to_display(&self, settings: &DisplaySettings) -> DisplayRow {
        let d = settings.decimals;
        let (lower, upper) = self.ci_exp();
        DisplayRow {
            parameter: self.parameter.clone(),
            coef: format!("{:.d$}", self.coef),
            se: format!("{:.d$}", self.se),
            coef_exp: format!("{:.d$}", self.coef_exp()),
            se_exp: format!("{:.d$}", self.se_exp()),
            ci_lower_exp: format!("{lower:.d$}"),
            ci_upper_exp: format!("{upper:.d$}"),
            pvalue: format_pvalue(self.pvalue, settings),
        }
    }
}

/// A coefficient row as written to the delimited table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub parameter: String,
    pub coef: String,
    pub se: String,
    pub coef_exp: String,
    pub se_exp: String,
    #[serde(rename = "CI_lower_exp")]
    pub ci_lower_exp: String,
    #[serde(rename = "CI_upper_exp")]
    pub ci_upper_exp: String,
    pub pvalue: String,
}

pub fn format_pvalue(p: f64, settings: &DisplaySettings) -> String {
    if p < settings.pvalue_floor {
        format!("<{}", settings.pvalue_floor)
    } else {
        format!("{:.*}", settings.pvalue_decimals, p)
    }
}
