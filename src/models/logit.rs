//! Maximum-likelihood logistic regression by iteratively reweighted least squares.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::design::DesignMatrix;
use super::distributions::two_sided_p;
use super::linalg::spd_inverse;
use crate::error::ModelError;

/// IRLS stopping rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative deviance change that counts as converged.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Fitted probabilities closer than this to 0 or 1 indicate separation.
    pub separation_epsilon: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 25,
            separation_epsilon: 1e-6,
        }
    }
}

/// A fitted binomial GLM with logit link.
#[derive(Debug, Clone)]
pub struct LogitFit {
    pub columns: Vec<String>,
    pub coefficients: Array1<f64>,
    pub std_errors: Array1<f64>,
    pub covariance: Array2<f64>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub n_obs: usize,
    pub iterations: usize,
}

impl LogitFit {
    /// Log-likelihood; equals `-deviance / 2` for 0/1 outcomes.
    pub fn log_likelihood(&self) -> f64 {
        -self.deviance / 2.0
    }

    pub fn n_params(&self) -> usize {
        self.columns.len()
    }

    pub fn residual_df(&self) -> usize {
        self.n_obs.saturating_sub(self.n_params())
    }

    pub fn aic(&self) -> f64 {
        self.deviance + 2.0 * self.n_params() as f64
    }

    /// Deviance over residual degrees of freedom. Reported, never corrected for.
    pub fn dispersion(&self) -> f64 {
        match self.residual_df() {
            0 => f64::NAN,
            df => self.deviance / df as f64,
        }
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Estimate and standard error of a named coefficient.
    pub fn coefficient(&self, column: &str) -> Option<(f64, f64)> {
        self.index_of(column)
            .map(|i| (self.coefficients[i], self.std_errors[i]))
    }

    pub fn p_value(&self, index: usize) -> f64 {
        two_sided_p(self.coefficients[index] / self.std_errors[index])
    }

    /// Estimate and standard error of a linear combination of coefficients.
    ///
    /// Returns `None` if a named column is not in the model.
    pub fn contrast(&self, weights: &[(&str, f64)]) -> Option<(f64, f64)> {
        let mut c = Array1::<f64>::zeros(self.columns.len());
        for (name, w) in weights {
            c[self.index_of(name)?] += w;
        }
        let estimate = c.dot(&self.coefficients);
        let variance = c.dot(&self.covariance.dot(&c));
        Some((estimate, variance.max(0.0).sqrt()))
    }
}

/// Fits `y ~ X` with a logit link.
///
/// # Errors
///
/// [`ModelError::EmptyData`] without observations, [`ModelError::Singular`]
/// when a design column is empty or collinear, [`ModelError::Separation`]
/// when fitted probabilities reach 0 or 1, and [`ModelError::NotConverged`]
/// when the iteration cap is hit.
#[tracing::instrument(skip_all, fields(n = design.y.len(), p = design.columns.len()))]
pub fn fit_logit(design: &DesignMatrix, settings: &SolverSettings) -> Result<LogitFit, ModelError> {
    let n = design.y.len();
    if n == 0 {
        return Err(ModelError::EmptyData);
    }
    let x = &design.x;
    let y = &design.y;

    let mut mu = y.mapv(|v| (v + 0.5) / 2.0);
    let mut eta = mu.mapv(|m| (m / (1.0 - m)).ln());
    let mut deviance = binomial_deviance(y, &mu);
    let mut coefficients = Array1::<f64>::zeros(design.columns.len());
    let mut converged = false;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        iterations += 1;

        let w = mu.mapv(|m| (m * (1.0 - m)).max(1e-12));
        let z = &eta + &((y - &mu) / &w);
        let (xtwx, xtwz) = weighted_normal_equations(x, &w, &z);

        let inverse = match spd_inverse(&xtwx) {
            Ok(inv) => inv,
            Err(col) => {
                check_separation(&mu, settings)?;
                return Err(ModelError::Singular {
                    column: design.columns[col].clone(),
                });
            }
        };
        coefficients = inverse.dot(&xtwz);
        eta = x.dot(&coefficients);
        mu = eta.mapv(logistic);

        let previous = deviance;
        deviance = binomial_deviance(y, &mu);
        debug!(iterations, deviance, "IRLS step");

        if (deviance - previous).abs() / (deviance.abs() + 0.1) < settings.tolerance {
            converged = true;
            break;
        }
    }

    check_separation(&mu, settings)?;
    if !converged {
        return Err(ModelError::NotConverged {
            iterations,
            deviance,
        });
    }

    // Fisher information at the converged estimate.
    let w = mu.mapv(|m| m * (1.0 - m));
    let (xtwx, _) = weighted_normal_equations(x, &w, &eta);
    let covariance = spd_inverse(&xtwx).map_err(|col| ModelError::Singular {
        column: design.columns[col].clone(),
    })?;
    let std_errors = covariance.diag().mapv(f64::sqrt);

    let y_bar = y.mean().unwrap_or(0.0);
    let null_deviance = binomial_deviance(y, &Array1::from_elem(n, y_bar));

    debug!(iterations, deviance, null_deviance, "IRLS converged");
    Ok(LogitFit {
        columns: design.columns.clone(),
        coefficients,
        std_errors,
        covariance,
        deviance,
        null_deviance,
        n_obs: n,
        iterations,
    })
}

fn weighted_normal_equations(
    x: &Array2<f64>,
    w: &Array1<f64>,
    z: &Array1<f64>,
) -> (Array2<f64>, Array1<f64>) {
    let xw = x * &w.view().insert_axis(Axis(1));
    (xw.t().dot(x), xw.t().dot(z))
}

fn check_separation(mu: &Array1<f64>, settings: &SolverSettings) -> Result<(), ModelError> {
    let eps = settings.separation_epsilon;
    let fitted_at_bound = mu.iter().filter(|&&m| m < eps || m > 1.0 - eps).count();
    if fitted_at_bound > 0 {
        warn!(fitted_at_bound, "Fitted probabilities numerically 0 or 1");
        return Err(ModelError::Separation { fitted_at_bound });
    }
    Ok(())
}

pub fn logistic(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// Bernoulli deviance, `-2` times the log-likelihood.
fn binomial_deviance(y: &Array1<f64>, mu: &Array1<f64>) -> f64 {
    y.iter()
        .zip(mu.iter())
        .map(|(&yi, &mi)| {
            let p = if yi > 0.5 { mi } else { 1.0 - mi };
            -2.0 * p.max(f64::MIN_POSITIVE).ln()
        })
        .sum()
}
