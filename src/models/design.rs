//! Treatment-contrast design matrices for the hotel × intervention models.

use ndarray::{Array1, Array2};

use crate::codes::Hotel;
use crate::expand::{InterventionEffect, ModelObservation};

pub const INTERCEPT: &str = "(Intercept)";
pub const HOTEL_FACTOR: &str = "hotel";
pub const INTERVENTION_FACTOR: &str = "intervention_effect";

/// Right-hand side of the model formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// `meal_type ~ hotel * intervention_effect`
    Interaction,
    /// `meal_type ~ intervention_effect`, the nested model without hotel.
    InterventionOnly,
}

#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub columns: Vec<String>,
    pub x: Array2<f64>,
    /// 1.0 for vegetarian orders.
    pub y: Array1<f64>,
}

impl DesignMatrix {
    /// Builds the matrix with `reference` as the baseline hotel and
    /// `levels[0]` as the baseline intervention.
    pub fn build(
        observations: &[ModelObservation],
        levels: &[InterventionEffect],
        reference: Hotel,
        formula: Formula,
    ) -> Self {
        let contrast_hotel = reference.other();
        let contrasts = levels.get(1..).unwrap_or_default();

        let mut columns = vec![INTERCEPT.to_string()];
        if formula == Formula::Interaction {
            columns.push(hotel_term(contrast_hotel));
        }
        columns.extend(contrasts.iter().map(|&level| intervention_term(level)));
        if formula == Formula::Interaction {
            columns.extend(
                contrasts
                    .iter()
                    .map(|&level| interaction_term(contrast_hotel, level)),
            );
        }

        let mut x = Array2::<f64>::zeros((observations.len(), columns.len()));
        let mut y = Array1::<f64>::zeros(observations.len());

        for (i, obs) in observations.iter().enumerate() {
            let mut row = x.row_mut(i);
            row[0] = 1.0;
            let mut col = 1;

            let in_contrast_hotel = obs.hotel == contrast_hotel;
            if formula == Formula::Interaction {
                row[col] = f64::from(u8::from(in_contrast_hotel));
                col += 1;
            }
            let level_col = contrasts.iter().position(|&l| l == obs.effect);
            if let Some(k) = level_col {
                row[col + k] = 1.0;
            }
            col += contrasts.len();
            if formula == Formula::Interaction && in_contrast_hotel {
                if let Some(k) = level_col {
                    row[col + k] = 1.0;
                }
            }

            y[i] = f64::from(u8::from(obs.vegetarian));
        }

        Self { columns, x, y }
    }
}

pub fn hotel_term(hotel: Hotel) -> String {
    format!("{HOTEL_FACTOR}{}", hotel.label())
}

pub fn intervention_term(level: InterventionEffect) -> String {
    format!("{INTERVENTION_FACTOR}{}", level.label())
}

pub fn interaction_term(hotel: Hotel, level: InterventionEffect) -> String {
    format!("{}:{}", hotel_term(hotel), intervention_term(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::Grouping;

    #[test]
    fn test_interaction_columns_hotel1_reference() {
        let design = DesignMatrix::build(
            &[],
            Grouping::Grouped.levels(),
            Hotel::Hotel1,
            Formula::Interaction,
        );
        assert_eq!(
            design.columns,
            vec![
                "(Intercept)",
                "hotelhotel 2",
                "intervention_effectBehavioural Interventions",
                "hotelhotel 2:intervention_effectBehavioural Interventions",
            ]
        );
    }

    #[test]
    fn test_interaction_columns_hotel2_reference_ungrouped() {
        let design = DesignMatrix::build(
            &[],
            Grouping::Ungrouped.levels(),
            Hotel::Hotel2,
            Formula::Interaction,
        );
        assert_eq!(design.columns.len(), 6);
        assert_eq!(design.columns[1], "hotelhotel 1");
        assert_eq!(
            design.columns[5],
            "hotelhotel 1:intervention_effectNon-Vegetarian Behavioural Intervention"
        );
    }

    #[test]
    fn test_rows_are_dummy_coded() {
        let observations = [
            obs(Hotel::Hotel1, InterventionEffect::Cognitive, true),
            obs(Hotel::Hotel2, InterventionEffect::Cognitive, false),
            obs(Hotel::Hotel1, InterventionEffect::Behavioural, false),
            obs(Hotel::Hotel2, InterventionEffect::Behavioural, true),
        ];
        let design = DesignMatrix::build(
            &observations,
            Grouping::Grouped.levels(),
            Hotel::Hotel1,
            Formula::Interaction,
        );

        assert_eq!(design.x.row(0).to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(design.x.row(1).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(design.x.row(2).to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(design.x.row(3).to_vec(), vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(design.y.to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_intervention_only_has_no_hotel_columns() {
        let observations = [obs(Hotel::Hotel2, InterventionEffect::Behavioural, true)];
        let design = DesignMatrix::build(
            &observations,
            Grouping::Grouped.levels(),
            Hotel::Hotel1,
            Formula::InterventionOnly,
        );
        assert_eq!(design.columns.len(), 2);
        assert_eq!(design.x.row(0).to_vec(), vec![1.0, 1.0]);
    }

    // Helper functions for tests
    fn obs(hotel: Hotel, effect: InterventionEffect, vegetarian: bool) -> ModelObservation {
        ModelObservation {
            hotel,
            effect,
            vegetarian,
        }
    }
}
