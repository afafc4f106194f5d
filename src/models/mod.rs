//! Logistic-regression models of vegetarian meal choice.
//!
//! Each model regresses `meal_type` on hotel, intervention and their
//! interaction. The interaction model is fitted once per reference hotel so
//! that both hotels' intervention effects can be read off directly, and the
//! results are merged into one coefficient table.

pub mod comparator;
pub mod design;
pub mod distributions;
pub mod linalg;
pub mod logit;
pub mod table;

pub use comparator::{LikelihoodRatioTest, ModelComparison, compare_model};
pub use logit::{LogitFit, SolverSettings, fit_logit};
pub use table::{CoefficientRow, DisplayRow, DisplaySettings};
