//! Runs the whole analysis and collects its results.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::co2::{self, Co2Comparison};
use crate::config::AnalysisConfig;
use crate::describe::{ShareRow, forest_breaks, vegetarian_shares};
use crate::expand::{Grouping, expand, filter_interventions};
use crate::models::{ModelComparison, compare_model};
use crate::records::AggregatedRecord;

pub const SCHEMA_VERSION: u8 = 1;

/// Complete analysis result, written as `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub aggregate_rows: usize,
    pub orders: usize,
    pub shares: Vec<ShareRow>,
    pub models: Vec<ModelComparison>,
    /// Log2 gridlines covering every odds-ratio interval except the intercepts.
    pub forest_breaks: Vec<f64>,
    pub co2: Co2Comparison,
}

impl AnalysisReport {
    pub fn model(&self, grouping: Grouping) -> Option<&ModelComparison> {
        self.models.iter().find(|m| m.grouping == grouping)
    }
}

/// Expands the aggregates, fits Model 1 (grouped) and Model 2 (ungrouped),
/// and projects CO2.
#[tracing::instrument(skip_all, fields(aggregate_rows = records.len()))]
pub fn run_analysis(records: &[AggregatedRecord], config: &AnalysisConfig) -> Result<AnalysisReport> {
    let orders = expand(records, config.code_policy).context("expanding aggregated rows")?;
    info!(orders = orders.len(), "Orders expanded");

    let shares = vegetarian_shares(&orders);

    let mut models = Vec::with_capacity(2);
    for grouping in [Grouping::Grouped, Grouping::Ungrouped] {
        let observations = filter_interventions(&orders, grouping);
        let comparison = compare_model(&observations, grouping, &config.solver)
            .with_context(|| format!("fitting {}", crate::models::comparator::model_name(grouping)))?;
        models.push(comparison);
    }

    let (lower, upper) = models
        .iter()
        .flat_map(|m| m.rows.iter())
        .filter(|r| r.parameter != "intercept")
        .map(|r| r.ci_exp())
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), (l, u)| (lo.min(l), hi.max(u)));

    let co2 = co2::compare(&orders, &config.co2).context("projecting CO2")?;

    Ok(AnalysisReport {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        aggregate_rows: records.len(),
        orders: orders.len(),
        shares,
        models,
        forest_breaks: forest_breaks(lower, upper),
        co2,
    })
}
