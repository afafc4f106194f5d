//! Descriptive tabulation of vegetarian order shares.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::codes::{Hotel, Intervention};
use crate::models::distributions::Z_975;
use crate::records::OrderRecord;

/// Smallest odds-ratio gridline on the forest plots' log2 axis.
pub const FOREST_BASE: f64 = 0.03125;

/// Vegetarian share for one hotel × intervention cell, with a 95% Wald interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub hotel: Hotel,
    pub intervention: Intervention,
    pub orders: usize,
    pub vegetarian: usize,
    pub share: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Tabulates every observed hotel × intervention cell, ordered by hotel then
/// intervention code. Orders without an intervention are left out.
pub fn vegetarian_shares(orders: &[OrderRecord]) -> Vec<ShareRow> {
    let mut cells: BTreeMap<(Hotel, Intervention), (usize, usize)> = BTreeMap::new();
    for order in orders {
        let Some(intervention) = order.intervention else {
            continue;
        };
        let cell = cells.entry((order.hotel, intervention)).or_default();
        cell.0 += 1;
        if order.meal_type.is_vegetarian() {
            cell.1 += 1;
        }
    }

    cells
        .into_iter()
        .map(|((hotel, intervention), (total, vegetarian))| {
            let share = vegetarian as f64 / total as f64;
            let half_width = Z_975 * (share * (1.0 - share) / total as f64).sqrt();
            ShareRow {
                hotel,
                intervention,
                orders: total,
                vegetarian,
                share,
                ci_lower: (share - half_width).max(0.0),
                ci_upper: (share + half_width).min(1.0),
            }
        })
        .collect()
}

/// Gridlines `0.03125 × 2^k` spanning `[lower, upper]`.
pub fn forest_breaks(lower: f64, upper: f64) -> Vec<f64> {
    if !(lower > 0.0 && upper >= lower && upper.is_finite()) {
        return Vec::new();
    }
    let k_min = (lower / FOREST_BASE).log2().floor() as i32;
    let k_max = (upper / FOREST_BASE).log2().ceil() as i32;
    (k_min..=k_max).map(|k| FOREST_BASE * 2f64.powi(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::MealType;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_shares_grouped_and_ordered() {
        let mut orders = orders_for(Hotel::Hotel2, Intervention::Cognitive, 1, 3);
        orders.extend(orders_for(Hotel::Hotel1, Intervention::VegetarianBehavioural, 3, 7));
        orders.extend(orders_for(Hotel::Hotel1, Intervention::DefaultGroup, 2, 8));

        let rows = vegetarian_shares(&orders);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            (rows[0].hotel, rows[0].intervention),
            (Hotel::Hotel1, Intervention::DefaultGroup)
        );
        assert_eq!(rows[1].intervention, Intervention::VegetarianBehavioural);
        assert_eq!(rows[2].hotel, Hotel::Hotel2);

        assert_eq!(rows[1].orders, 10);
        assert_eq!(rows[1].vegetarian, 3);
        assert_abs_diff_eq!(rows[1].share, 0.3);
        let half = Z_975 * (0.3_f64 * 0.7 / 10.0).sqrt();
        assert_abs_diff_eq!(rows[1].ci_lower, 0.3 - half, epsilon = 1e-12);
        assert_abs_diff_eq!(rows[1].ci_upper, 0.3 + half, epsilon = 1e-12);
    }

    #[test]
    fn test_share_interval_is_clipped() {
        let rows = vegetarian_shares(&orders_for(Hotel::Hotel1, Intervention::Cognitive, 1, 1));
        assert_eq!(rows[0].ci_upper, 1.0);
        assert_eq!(rows[0].ci_lower, 0.0);
    }

    #[test]
    fn test_forest_breaks_cover_range() {
        assert_eq!(forest_breaks(0.4, 3.0), vec![0.25, 0.5, 1.0, 2.0, 4.0]);
        assert_eq!(forest_breaks(0.03125, 0.0625), vec![0.03125, 0.0625]);
        assert!(forest_breaks(0.0, 1.0).is_empty());
        assert!(forest_breaks(2.0, 1.0).is_empty());
    }

    // Helper functions for tests
    fn orders_for(
        hotel: Hotel,
        intervention: Intervention,
        veg: usize,
        meat: usize,
    ) -> Vec<OrderRecord> {
        let order = |meal_type| OrderRecord {
            hotel,
            date: NaiveDate::from_ymd_opt(2023, 3, 6).unwrap(),
            intervention: Some(intervention),
            meal_type,
            weekday: None,
            is_weekend: None,
        };
        let mut out = vec![order(MealType::Vegetarian); veg];
        out.extend(vec![order(MealType::MeatBased); meat]);
        out
    }
}
