//! Annual CO2 projection from observed meal-type proportions.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::codes::{Hotel, Intervention};
use crate::error::Co2Error;
use crate::records::OrderRecord;

pub const SERVICE_DAYS_PER_WEEK: f64 = 5.0;
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Emission factors per meal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Co2Factors {
    pub meat_based_kg: f64,
    pub vegetarian_kg: f64,
}

impl Co2Factors {
    fn validate(&self) -> Result<(), Co2Error> {
        for (name, value) in [
            ("meat_based_kg", self.meat_based_kg),
            ("vegetarian_kg", self.vegetarian_kg),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Co2Error::InvalidFactor { name, value });
            }
        }
        Ok(())
    }
}

impl Default for Co2Factors {
    fn default() -> Self {
        Self {
            meat_based_kg: 2.9,
            vegetarian_kg: 1.7,
        }
    }
}

/// Which comparison to project and at what volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Co2Settings {
    pub hotel: Hotel,
    #[serde(deserialize_with = "Intervention::deserialize_code_or_label")]
    pub intervention: Intervention,
    pub daily_meal_rate: f64,
    pub factors: Co2Factors,
}

impl Default for Co2Settings {
    fn default() -> Self {
        Self {
            hotel: Hotel::Hotel1,
            intervention: Intervention::VegetarianBehavioural,
            daily_meal_rate: 40.0,
            factors: Co2Factors::default(),
        }
    }
}

pub fn annual_meals(daily_meal_rate: f64) -> f64 {
    daily_meal_rate * SERVICE_DAYS_PER_WEEK * WEEKS_PER_YEAR
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupProjection {
    pub hotel: Hotel,
    pub intervention: Intervention,
    pub observed_meals: usize,
    pub vegetarian_share: f64,
    pub meat_based_share: f64,
    pub annual_meals: f64,
    pub annual_co2_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Co2Comparison {
    pub baseline: GroupProjection,
    pub intervention: GroupProjection,
    pub reduction_kg: f64,
    pub reduction_percent: f64,
}

/// Projects one hotel × intervention group to a year of meals.
///
/// # Errors
///
/// [`Co2Error::EmptyGroup`] when the group has no observed meals, and
/// [`Co2Error::InvalidRate`] or [`Co2Error::InvalidFactor`] for non-positive inputs.
pub fn project(
    orders: &[OrderRecord],
    hotel: Hotel,
    intervention: Intervention,
    daily_meal_rate: f64,
    factors: &Co2Factors,
) -> Result<GroupProjection, Co2Error> {
    if !(daily_meal_rate > 0.0) {
        return Err(Co2Error::InvalidRate(daily_meal_rate));
    }
    factors.validate()?;

    let (observed, vegetarian) = orders
        .iter()
        .filter(|o| o.hotel == hotel && o.intervention == Some(intervention))
        .fold((0usize, 0usize), |(n, v), o| {
            (n + 1, v + usize::from(o.meal_type.is_vegetarian()))
        });
    if observed == 0 {
        return Err(Co2Error::EmptyGroup {
            hotel: hotel.to_string(),
            intervention: intervention.to_string(),
        });
    }

    let vegetarian_share = vegetarian as f64 / observed as f64;
    let meat_based_share = (observed - vegetarian) as f64 / observed as f64;
    let annual = annual_meals(daily_meal_rate);
    let annual_co2_kg = annual * meat_based_share * factors.meat_based_kg
        + annual * vegetarian_share * factors.vegetarian_kg;

    Ok(GroupProjection {
        hotel,
        intervention,
        observed_meals: observed,
        vegetarian_share,
        meat_based_share,
        annual_meals: annual,
        annual_co2_kg,
    })
}

/// Compares the Default Group against `settings.intervention` in `settings.hotel`.
pub fn compare(orders: &[OrderRecord], settings: &Co2Settings) -> Result<Co2Comparison, Co2Error> {
    let baseline = project(
        orders,
        settings.hotel,
        Intervention::DefaultGroup,
        settings.daily_meal_rate,
        &settings.factors,
    )?;
    let intervention = project(
        orders,
        settings.hotel,
        settings.intervention,
        settings.daily_meal_rate,
        &settings.factors,
    )?;

    let reduction_kg = baseline.annual_co2_kg - intervention.annual_co2_kg;
    let reduction_percent = reduction_kg / baseline.annual_co2_kg * 100.0;
    info!(
        hotel = %settings.hotel,
        intervention = %settings.intervention,
        baseline_kg = baseline.annual_co2_kg,
        intervention_kg = intervention.annual_co2_kg,
        reduction_percent,
        "CO2 projection"
    );

    Ok(Co2Comparison {
        baseline,
        intervention,
        reduction_kg,
        reduction_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::MealType;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_default_group_projection() {
        // 10 observed days, 30% vegetarian overall.
        let orders = daily_orders(Intervention::DefaultGroup, 10, 3, 7);
        let projection = project(
            &orders,
            Hotel::Hotel1,
            Intervention::DefaultGroup,
            40.0,
            &Co2Factors::default(),
        )
        .unwrap();

        assert_eq!(projection.observed_meals, 100);
        assert_eq!(projection.annual_meals, 10_400.0);
        assert_relative_eq!(
            projection.annual_co2_kg,
            40.0 * 5.0 * 52.0 * 0.7 * 2.9 + 40.0 * 5.0 * 52.0 * 0.3 * 1.7,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_reduction_percent() {
        let mut orders = daily_orders(Intervention::DefaultGroup, 10, 3, 7);
        orders.extend(daily_orders(Intervention::VegetarianBehavioural, 10, 5, 5));

        let result = compare(&orders, &Co2Settings::default()).unwrap();

        let baseline = 10_400.0 * (0.7 * 2.9 + 0.3 * 1.7);
        let treated = 10_400.0 * (0.5 * 2.9 + 0.5 * 1.7);
        assert_relative_eq!(result.baseline.annual_co2_kg, baseline, max_relative = 1e-12);
        assert_relative_eq!(result.intervention.annual_co2_kg, treated, max_relative = 1e-12);
        assert_relative_eq!(
            result.reduction_percent,
            (baseline - treated) / baseline * 100.0,
            max_relative = 1e-12
        );
        assert!(result.reduction_percent > 0.0);
    }

    #[test]
    fn test_empty_group_is_an_error() {
        let orders = daily_orders(Intervention::DefaultGroup, 2, 1, 1);
        let err = compare(&orders, &Co2Settings::default()).unwrap_err();
        assert_eq!(
            err,
            Co2Error::EmptyGroup {
                hotel: "hotel 1".to_string(),
                intervention: "Vegetarian Behavioural Intervention".to_string(),
            }
        );
    }

    #[test]
    fn test_non_positive_rate_is_rejected() {
        let orders = daily_orders(Intervention::DefaultGroup, 1, 1, 1);
        let err = project(
            &orders,
            Hotel::Hotel1,
            Intervention::DefaultGroup,
            0.0,
            &Co2Factors::default(),
        )
        .unwrap_err();
        assert_eq!(err, Co2Error::InvalidRate(0.0));
    }

    #[test]
    fn test_zero_emission_factors_are_rejected() {
        let orders = daily_orders(Intervention::DefaultGroup, 2, 1, 1);
        let settings = Co2Settings {
            factors: Co2Factors {
                meat_based_kg: 0.0,
                vegetarian_kg: 0.0,
            },
            ..Co2Settings::default()
        };

        let err = compare(&orders, &settings).unwrap_err();
        assert_eq!(
            err,
            Co2Error::InvalidFactor {
                name: "meat_based_kg",
                value: 0.0
            }
        );
    }

    // Helper functions for tests
    fn daily_orders(
        intervention: Intervention,
        days: i64,
        veg_per_day: usize,
        meat_per_day: usize,
    ) -> Vec<OrderRecord> {
        let start = NaiveDate::from_ymd_opt(2023, 3, 6).unwrap();
        let mut out = Vec::new();
        for day in 0..days {
            let order = |meal_type| OrderRecord {
                hotel: Hotel::Hotel1,
                date: start + Duration::days(day),
                intervention: Some(intervention),
                meal_type,
                weekday: None,
                is_weekend: None,
            };
            out.extend(vec![order(MealType::Vegetarian); veg_per_day]);
            out.extend(vec![order(MealType::MeatBased); meat_per_day]);
        }
        out
    }
}
