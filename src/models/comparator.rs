//! Runs one model specification end to end: the interaction model fitted with
//! each hotel as the reference category, the merged coefficient table, the
//! dispersion check, and the likelihood-ratio test against the model
//! without hotel.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::design::{
    DesignMatrix, Formula, HOTEL_FACTOR, INTERCEPT, INTERVENTION_FACTOR, interaction_term,
    intervention_term,
};
use super::distributions::chi_squared_sf;
use super::logit::{LogitFit, SolverSettings, fit_logit};
use super::table::CoefficientRow;
use crate::codes::Hotel;
use crate::error::ModelError;
use crate::expand::{Grouping, ModelObservation};

/// Merged estimates agreeing within this are considered identical.
const MERGE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize)]
pub struct LikelihoodRatioTest {
    pub statistic: f64,
    pub df: usize,
    pub pvalue: f64,
    pub full_log_likelihood: f64,
    pub reduced_log_likelihood: f64,
}

/// Everything reported for one model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub name: String,
    pub grouping: Grouping,
    pub levels: Vec<String>,
    pub rows: Vec<CoefficientRow>,
    pub n_obs: usize,
    pub deviance: f64,
    pub null_deviance: f64,
    pub residual_df: usize,
    pub aic: f64,
    pub dispersion: f64,
    pub hotel_moderation: LikelihoodRatioTest,
    /// Largest gap between a merged simple effect and the same effect
    /// computed as a contrast in the first fit.
    pub merge_discrepancy: f64,
}

pub fn model_name(grouping: Grouping) -> &'static str {
    match grouping {
        Grouping::Grouped => "Model 1",
        Grouping::Ungrouped => "Model 2",
    }
}

/// Fits `meal_type ~ hotel * intervention_effect` and its nested comparison.
///
/// # Errors
///
/// Propagates solver failures from any of the three fits.
#[tracing::instrument(skip(observations, settings), fields(n = observations.len()))]
pub fn compare_model(
    observations: &[ModelObservation],
    grouping: Grouping,
    settings: &SolverSettings,
) -> Result<ModelComparison, ModelError> {
    let levels = grouping.levels();
    let [hotel_a, hotel_b] = Hotel::ALL;

    let fit_a = fit_logit(
        &DesignMatrix::build(observations, levels, hotel_a, Formula::Interaction),
        settings,
    )?;
    let fit_b = fit_logit(
        &DesignMatrix::build(observations, levels, hotel_b, Formula::Interaction),
        settings,
    )?;

    let rows = merge_reference_fits(&fit_a, hotel_a, &fit_b, hotel_b);
    let merge_discrepancy = merge_discrepancy(&fit_a, &fit_b, grouping, hotel_b);
    if merge_discrepancy > MERGE_TOLERANCE {
        warn!(merge_discrepancy, "Reference fits disagree on simple effects");
    } else {
        debug!(merge_discrepancy, "Reference fits agree");
    }

    let reduced = fit_logit(
        &DesignMatrix::build(observations, levels, hotel_a, Formula::InterventionOnly),
        settings,
    )?;
    let hotel_moderation = likelihood_ratio_test(&fit_a, &reduced)?;

    let dispersion = fit_a.dispersion();
    info!(
        model = model_name(grouping),
        deviance = fit_a.deviance,
        residual_df = fit_a.residual_df(),
        dispersion,
        lr_pvalue = hotel_moderation.pvalue,
        "Model fitted"
    );

    Ok(ModelComparison {
        name: model_name(grouping).to_string(),
        grouping,
        levels: levels.iter().map(|l| l.label().to_string()).collect(),
        rows,
        n_obs: fit_a.n_obs,
        deviance: fit_a.deviance,
        null_deviance: fit_a.null_deviance,
        residual_df: fit_a.residual_df(),
        aic: fit_a.aic(),
        dispersion,
        hotel_moderation,
        merge_discrepancy,
    })
}

/// Builds the per-hotel coefficient table from two fits of the same formula.
///
/// From `fit_a` (reference `hotel_a`) the intercept, the hotel main effect and
/// the intervention terms are kept; its `hotel_b:` interaction terms are
/// dropped. From `fit_b` only the intervention terms are kept, which are the
/// simple effects within `hotel_b`.
pub fn merge_reference_fits(
    fit_a: &LogitFit,
    hotel_a: Hotel,
    fit_b: &LogitFit,
    hotel_b: Hotel,
) -> Vec<CoefficientRow> {
    let from_a = (0..fit_a.n_params())
        .filter(|&i| !fit_a.columns[i].contains(':'))
        .map(|i| row_for(fit_a, i, hotel_a));
    let from_b = (0..fit_b.n_params())
        .filter(|&i| {
            let name = &fit_b.columns[i];
            name.starts_with(INTERVENTION_FACTOR) && !name.contains(':')
        })
        .map(|i| row_for(fit_b, i, hotel_b));

    from_a.chain(from_b).collect()
}

fn row_for(fit: &LogitFit, index: usize, reference: Hotel) -> CoefficientRow {
    CoefficientRow::new(
        rename_parameter(&fit.columns[index], reference),
        fit.coefficients[index],
        fit.std_errors[index],
        fit.p_value(index),
    )
}

/// Rewrites a model column name for the report.
///
/// `(Intercept)` becomes `intercept`, `hotelhotel 2` becomes `hotel 2`, and
/// intervention terms are prefixed with the hotel they are measured in.
pub fn rename_parameter(column: &str, reference: Hotel) -> String {
    if column == INTERCEPT {
        "intercept".to_string()
    } else if let Some(level) = column.strip_prefix(INTERVENTION_FACTOR) {
        format!("{} intervention {level}", reference.label())
    } else if column.contains(INTERVENTION_FACTOR) {
        format!("{} {}", reference.label(), column)
    } else if let Some(hotel) = column.strip_prefix(HOTEL_FACTOR) {
        hotel.to_string()
    } else {
        column.to_string()
    }
}

/// Compares each simple effect read from `fit_b` against the same quantity
/// computed as a linear contrast in `fit_a`.
fn merge_discrepancy(fit_a: &LogitFit, fit_b: &LogitFit, grouping: Grouping, hotel_b: Hotel) -> f64 {
    grouping
        .levels()
        .iter()
        .skip(1)
        .filter_map(|&level| {
            let main = intervention_term(level);
            let interaction = interaction_term(hotel_b, level);
            let (contrast, _) = fit_a.contrast(&[(main.as_str(), 1.0), (interaction.as_str(), 1.0)])?;
            let (direct, _) = fit_b.coefficient(&main)?;
            Some((contrast - direct).abs())
        })
        .fold(0.0, f64::max)
}

/// Likelihood-ratio test of `full` against the nested `reduced` model.
///
/// # Errors
///
/// [`ModelError::NotNested`] when `reduced` has at least as many parameters.
pub fn likelihood_ratio_test(
    full: &LogitFit,
    reduced: &LogitFit,
) -> Result<LikelihoodRatioTest, ModelError> {
    if reduced.n_params() >= full.n_params() {
        return Err(ModelError::NotNested {
            full: full.n_params(),
            reduced: reduced.n_params(),
        });
    }
    let df = full.n_params() - reduced.n_params();
    // Deviance difference; rounding can push it marginally below zero.
    let statistic = (reduced.deviance - full.deviance).max(0.0);

    Ok(LikelihoodRatioTest {
        statistic,
        df,
        pvalue: chi_squared_sf(statistic, df),
        full_log_likelihood: full.log_likelihood(),
        reduced_log_likelihood: reduced.log_likelihood(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::InterventionEffect;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case("(Intercept)", Hotel::Hotel1, "intercept")]
    #[case("hotelhotel 2", Hotel::Hotel1, "hotel 2")]
    #[case(
        "intervention_effectBehavioural Interventions",
        Hotel::Hotel1,
        "hotel 1 intervention Behavioural Interventions"
    )]
    #[case(
        "intervention_effectCognitive Intervention",
        Hotel::Hotel2,
        "hotel 2 intervention Cognitive Intervention"
    )]
    fn test_rename_parameter(#[case] column: &str, #[case] hotel: Hotel, #[case] expected: &str) {
        assert_eq!(rename_parameter(column, hotel), expected);
    }

    #[test]
    fn test_grouped_table_layout() {
        let comparison = compare_model(
            &observations_with_rates(&[(12, 40), (20, 40), (15, 40), (30, 40)], Grouping::Grouped),
            Grouping::Grouped,
            &SolverSettings::default(),
        )
        .unwrap();

        let names: Vec<_> = comparison.rows.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "intercept",
                "hotel 2",
                "hotel 1 intervention Behavioural Interventions",
                "hotel 2 intervention Behavioural Interventions",
            ]
        );
        assert_eq!(comparison.name, "Model 1");
        assert_eq!(comparison.hotel_moderation.df, 2);
    }

    #[test]
    fn test_ungrouped_table_has_one_row_per_hotel_contrast() {
        let comparison = compare_model(
            &observations_with_rates(
                &[(12, 40), (20, 40), (15, 40), (30, 40), (10, 40), (18, 40)],
                Grouping::Ungrouped,
            ),
            Grouping::Ungrouped,
            &SolverSettings::default(),
        )
        .unwrap();

        // intercept + hotel + 2 hotels × 2 contrasts
        assert_eq!(comparison.rows.len(), 6);
        assert!(comparison.rows.iter().all(|r| !r.parameter.contains(':')));
        assert_eq!(comparison.hotel_moderation.df, 3);
    }

    #[test]
    fn test_merged_simple_effects_match_cell_log_odds() {
        let rates = [(12, 40), (20, 40), (15, 40), (30, 40)];
        let comparison = compare_model(
            &observations_with_rates(&rates, Grouping::Grouped),
            Grouping::Grouped,
            &SolverSettings::default(),
        )
        .unwrap();

        let logit = |(k, n): (usize, usize)| (k as f64 / (n - k) as f64).ln();
        // Cells: (h1 cog, h2 cog, h1 beh, h2 beh)
        assert_abs_diff_eq!(comparison.rows[0].coef, logit(rates[0]), epsilon = 1e-6);
        assert_abs_diff_eq!(
            comparison.rows[1].coef,
            logit(rates[1]) - logit(rates[0]),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            comparison.rows[2].coef,
            logit(rates[2]) - logit(rates[0]),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            comparison.rows[3].coef,
            logit(rates[3]) - logit(rates[1]),
            epsilon = 1e-6
        );
        assert!(comparison.merge_discrepancy < 1e-6);
    }

    #[test]
    fn test_reference_refits_agree_on_odds_ratios() {
        let observations = observations_with_rates(
            &[(12, 40), (20, 40), (15, 40), (30, 40), (10, 40), (18, 40)],
            Grouping::Ungrouped,
        );
        let levels = Grouping::Ungrouped.levels();
        let settings = SolverSettings::default();
        let fit_a = fit_logit(
            &DesignMatrix::build(&observations, levels, Hotel::Hotel1, Formula::Interaction),
            &settings,
        )
        .unwrap();
        let fit_b = fit_logit(
            &DesignMatrix::build(&observations, levels, Hotel::Hotel2, Formula::Interaction),
            &settings,
        )
        .unwrap();

        for &level in &levels[1..] {
            let main = intervention_term(level);
            let interaction = interaction_term(Hotel::Hotel2, level);
            let (est, se) = fit_a
                .contrast(&[(main.as_str(), 1.0), (interaction.as_str(), 1.0)])
                .unwrap();
            let (direct, direct_se) = fit_b.coefficient(&main).unwrap();
            assert_abs_diff_eq!(est.exp(), direct.exp(), epsilon = 1e-6);
            assert_abs_diff_eq!(se, direct_se, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(fit_a.deviance, fit_b.deviance, epsilon = 1e-8);
    }

    #[test]
    fn test_lr_statistic_is_twice_log_likelihood_gap() {
        let comparison = compare_model(
            &observations_with_rates(&[(12, 40), (20, 40), (15, 40), (30, 40)], Grouping::Grouped),
            Grouping::Grouped,
            &SolverSettings::default(),
        )
        .unwrap();
        let lr = &comparison.hotel_moderation;

        assert_abs_diff_eq!(
            lr.statistic,
            2.0 * (lr.full_log_likelihood - lr.reduced_log_likelihood),
            epsilon = 1e-9
        );
        assert!(lr.statistic >= 0.0);
        assert!((0.0..=1.0).contains(&lr.pvalue));
    }

    #[test]
    fn test_lr_statistic_near_zero_without_hotel_effect() {
        let comparison = compare_model(
            &observations_with_rates(&[(10, 40), (10, 40), (20, 40), (20, 40)], Grouping::Grouped),
            Grouping::Grouped,
            &SolverSettings::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(comparison.hotel_moderation.statistic, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(comparison.hotel_moderation.pvalue, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lr_rejects_non_nested_models() {
        let observations =
            observations_with_rates(&[(12, 40), (20, 40), (15, 40), (30, 40)], Grouping::Grouped);
        let levels = Grouping::Grouped.levels();
        let settings = SolverSettings::default();
        let full = fit_logit(
            &DesignMatrix::build(&observations, levels, Hotel::Hotel1, Formula::Interaction),
            &settings,
        )
        .unwrap();

        assert!(matches!(
            likelihood_ratio_test(&full, &full),
            Err(ModelError::NotNested { full: 4, reduced: 4 })
        ));
    }

    #[test]
    fn test_dispersion_is_deviance_over_df() {
        let comparison = compare_model(
            &observations_with_rates(&[(12, 40), (20, 40), (15, 40), (30, 40)], Grouping::Grouped),
            Grouping::Grouped,
            &SolverSettings::default(),
        )
        .unwrap();
        assert_eq!(comparison.residual_df, 156);
        assert_abs_diff_eq!(
            comparison.dispersion,
            comparison.deviance / 156.0,
            epsilon = 1e-12
        );
    }

    // Helper functions for tests

    /// `rates[k]` is (vegetarian, total) for the k-th cell, cells ordered by
    /// level then hotel: (h1 L0, h2 L0, h1 L1, h2 L1, ...).
    fn observations_with_rates(rates: &[(usize, usize)], grouping: Grouping) -> Vec<ModelObservation> {
        let levels: &[InterventionEffect] = grouping.levels();
        let mut out = Vec::new();
        for (k, &(veg, total)) in rates.iter().enumerate() {
            let effect = levels[k / 2];
            let hotel = Hotel::ALL[k % 2];
            out.extend((0..total).map(|i| ModelObservation {
                hotel,
                effect,
                vegetarian: i < veg,
            }));
        }
        out
    }
}
