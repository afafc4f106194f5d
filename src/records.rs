//! Row types flowing through the pipeline.

use chrono::NaiveDate;
use serde::Serialize;

use crate::codes::{Hotel, Intervention, MealType, Weekday, Weekend};

/// One hotel-date-intervention row of the spreadsheet, still carrying raw codes.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub hotel: Hotel,
    pub date: NaiveDate,
    pub intervention_code: i64,
    pub n_vegetarian: i64,
    pub n_non_vegetarian: i64,
    pub day_code: i64,
    pub weekend_code: Option<i64>,
    /// Source line in the input file, kept for error messages.
    pub line: u64,
}

/// A single meal order after expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub hotel: Hotel,
    pub date: NaiveDate,
    pub intervention: Option<Intervention>,
    pub meal_type: MealType,
    pub weekday: Option<Weekday>,
    pub is_weekend: Option<Weekend>,
}
