//! Error types for ingestion, model fitting, and the CO2 projection.

use thiserror::Error;

/// Problems with the aggregated input rows.
#[derive(Debug, Error)]
pub enum DataError {
    /// The CSV reader could not read or deserialize a record.
    #[error("line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    /// A field held a value that has no meaning in the study design.
    #[error("line {line}: unexpected {field} value {value:?}")]
    UnexpectedCode {
        line: u64,
        field: &'static str,
        value: String,
    },

    /// A required cell was empty.
    #[error("line {line}: missing {field} value")]
    MissingValue { line: u64, field: &'static str },

    /// A meal count was negative, or the counts overflow the order total.
    #[error("line {line}: {field} count {value} is negative or too large")]
    InvalidCount {
        line: u64,
        field: &'static str,
        value: i64,
    },

    /// The expanded dataset cannot be held in memory.
    #[error("cannot allocate {orders} order records")]
    TooManyOrders { orders: usize },

    /// The date cell did not match any accepted format.
    #[error("line {line}: cannot parse date {value:?}")]
    InvalidDate { line: u64, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Conditions reported by the logistic-regression solver.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("no observations to fit")]
    EmptyData,

    /// The weighted cross-product matrix could not be inverted.
    #[error("design matrix is rank deficient (column {column:?})")]
    Singular { column: String },

    #[error("IRLS did not converge after {iterations} iterations (deviance {deviance:.6})")]
    NotConverged { iterations: usize, deviance: f64 },

    /// Fitted probabilities hit 0 or 1: the outcome is perfectly predicted in some cell.
    #[error("complete or quasi-complete separation detected ({fitted_at_bound} fitted probabilities at 0 or 1)")]
    Separation { fitted_at_bound: usize },

    #[error("nested model has {reduced} parameters, full model has {full}")]
    NotNested { full: usize, reduced: usize },
}

/// Failures of the CO2 projection.
#[derive(Debug, Error, PartialEq)]
pub enum Co2Error {
    #[error("no meals observed for {hotel} / {intervention}")]
    EmptyGroup { hotel: String, intervention: String },

    #[error("daily meal rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("emission factor {name} must be positive, got {value}")]
    InvalidFactor { name: &'static str, value: f64 },
}

/// Failures while loading the analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid delimiter {0:?}: must be a single ASCII character")]
    Delimiter(String),
}
