//! Aggregate-to-order expansion and the intervention grouping used by the models.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::codes::{Hotel, Intervention, MealType, Weekday, Weekend};
use crate::error::DataError;
use crate::records::{AggregatedRecord, OrderRecord};

/// What to do with a code that is not in a lookup table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodePolicy {
    /// Unmapped codes are a data error.
    #[default]
    Strict,
    /// Unmapped codes become null on the order record.
    Lenient,
}

/// Expands aggregated rows into one [`OrderRecord`] per meal.
///
/// Output preserves input order; within a row, vegetarian orders come first.
///
/// # Errors
///
/// Every row is validated before any output is allocated. Negative counts
/// and counts whose sum overflows always fail. Unmapped intervention, weekday
/// or weekend codes, and a missing hotel 1 weekend code, fail under
/// [`CodePolicy::Strict`].
pub fn expand(
    records: &[AggregatedRecord],
    policy: CodePolicy,
) -> Result<Vec<OrderRecord>, DataError> {
    let blocks = records
        .iter()
        .map(|record| resolve(record, policy))
        .collect::<Result<Vec<_>, _>>()?;

    let mut total = 0usize;
    for (block, record) in blocks.iter().zip(records) {
        total = total
            .checked_add(block.n_vegetarian)
            .ok_or(DataError::InvalidCount {
                line: record.line,
                field: "N_Vegetarian",
                value: record.n_vegetarian,
            })?
            .checked_add(block.n_meat_based)
            .ok_or(DataError::InvalidCount {
                line: record.line,
                field: "N_Non-Vegetarian",
                value: record.n_non_vegetarian,
            })?;
    }
    let mut orders: Vec<OrderRecord> = Vec::new();
    orders
        .try_reserve_exact(total)
        .map_err(|_| DataError::TooManyOrders { orders: total })?;

    for block in &blocks {
        let order = |meal_type| OrderRecord {
            meal_type,
            ..block.template.clone()
        };
        orders.extend(std::iter::repeat_n(order(MealType::Vegetarian), block.n_vegetarian));
        orders.extend(std::iter::repeat_n(order(MealType::MeatBased), block.n_meat_based));
    }

    debug!(
        aggregates = records.len(),
        orders = orders.len(),
        "Expanded aggregated rows"
    );
    Ok(orders)
}

/// One validated aggregated row, ready to be repeated into orders.
struct OrderBlock {
    template: OrderRecord,
    n_vegetarian: usize,
    n_meat_based: usize,
}

fn resolve(record: &AggregatedRecord, policy: CodePolicy) -> Result<OrderBlock, DataError> {
    let n_vegetarian = check_count(record.n_vegetarian, "N_Vegetarian", record.line)?;
    let n_meat_based = check_count(record.n_non_vegetarian, "N_Non-Vegetarian", record.line)?;

    let intervention = lookup(
        Intervention::from_code(record.intervention_code),
        record.intervention_code,
        "Experimental_Condition",
        record,
        policy,
    )?;
    let weekday = lookup(
        Weekday::from_code(record.day_code),
        record.day_code,
        "Day",
        record,
        policy,
    )?;
    let is_weekend = match record.hotel {
        // Hotel 2 serves weekdays only.
        Hotel::Hotel2 => Some(Weekend::NoWeekend),
        Hotel::Hotel1 => match record.weekend_code {
            Some(code) => lookup(Weekend::from_code(code), code, "Weekend", record, policy)?,
            None if policy == CodePolicy::Strict => {
                return Err(DataError::MissingValue {
                    line: record.line,
                    field: "Weekend",
                });
            }
            None => None,
        },
    };

    Ok(OrderBlock {
        template: OrderRecord {
            hotel: record.hotel,
            date: record.date,
            intervention,
            meal_type: MealType::Vegetarian,
            weekday,
            is_weekend,
        },
        n_vegetarian,
        n_meat_based,
    })
}

fn check_count(value: i64, field: &'static str, line: u64) -> Result<usize, DataError> {
    usize::try_from(value).map_err(|_| DataError::InvalidCount { line, field, value })
}

fn lookup<T>(
    mapped: Option<T>,
    code: i64,
    field: &'static str,
    record: &AggregatedRecord,
    policy: CodePolicy,
) -> Result<Option<T>, DataError> {
    match (mapped, policy) {
        (Some(value), _) => Ok(Some(value)),
        (None, CodePolicy::Lenient) => {
            warn!(line = record.line, field, code, "Unmapped code recoded as missing");
            Ok(None)
        }
        (None, CodePolicy::Strict) => Err(DataError::UnexpectedCode {
            line: record.line,
            field,
            value: code.to_string(),
        }),
    }
}

/// How the non-control interventions are coded for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Both behavioural interventions merged into one level (Model 1).
    Grouped,
    /// The three non-control interventions kept apart (Model 2).
    Ungrouped,
}

impl Grouping {
    /// Levels of the intervention-effect factor; the first is the reference.
    pub fn levels(self) -> &'static [InterventionEffect] {
        match self {
            Grouping::Grouped => &[
                InterventionEffect::Cognitive,
                InterventionEffect::Behavioural,
            ],
            Grouping::Ungrouped => &[
                InterventionEffect::Cognitive,
                InterventionEffect::VegetarianBehavioural,
                InterventionEffect::NonVegetarianBehavioural,
            ],
        }
    }

    /// Recodes an intervention; `None` for the Default Group.
    pub fn recode(self, intervention: Intervention) -> Option<InterventionEffect> {
        match (intervention, self) {
            (Intervention::DefaultGroup, _) => None,
            (Intervention::Cognitive, _) => Some(InterventionEffect::Cognitive),
            (
                Intervention::VegetarianBehavioural | Intervention::NonVegetarianBehavioural,
                Grouping::Grouped,
            ) => Some(InterventionEffect::Behavioural),
            (Intervention::VegetarianBehavioural, Grouping::Ungrouped) => {
                Some(InterventionEffect::VegetarianBehavioural)
            }
            (Intervention::NonVegetarianBehavioural, Grouping::Ungrouped) => {
                Some(InterventionEffect::NonVegetarianBehavioural)
            }
        }
    }
}

/// Intervention factor as seen by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterventionEffect {
    Cognitive,
    Behavioural,
    VegetarianBehavioural,
    NonVegetarianBehavioural,
}

impl InterventionEffect {
    pub fn label(self) -> &'static str {
        match self {
            InterventionEffect::Cognitive => "Cognitive Intervention",
            InterventionEffect::Behavioural => "Behavioural Interventions",
            InterventionEffect::VegetarianBehavioural => "Vegetarian Behavioural Intervention",
            InterventionEffect::NonVegetarianBehavioural => {
                "Non-Vegetarian Behavioural Intervention"
            }
        }
    }
}

impl fmt::Display for InterventionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The model-facing view of one order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelObservation {
    pub hotel: Hotel,
    pub effect: InterventionEffect,
    pub vegetarian: bool,
}

/// Drops Default Group orders (and orders with a missing intervention) and
/// recodes the rest under `grouping`.
pub fn filter_interventions(orders: &[OrderRecord], grouping: Grouping) -> Vec<ModelObservation> {
    let observations: Vec<_> = orders
        .iter()
        .filter_map(|o| {
            let effect = grouping.recode(o.intervention?)?;
            Some(ModelObservation {
                hotel: o.hotel,
                effect,
                vegetarian: o.meal_type.is_vegetarian(),
            })
        })
        .collect();

    debug!(
        ?grouping,
        kept = observations.len(),
        dropped = orders.len() - observations.len(),
        "Filtered orders for model"
    );
    observations
}
