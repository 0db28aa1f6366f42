//! Derivative-free minimization
//!
//! Thin layer over argmin's Nelder–Mead solver. It seeds the simplex around a
//! starting point, runs the executor under an iteration budget and reports
//! whether the solver met its tolerance or ran out of iterations.

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use tracing::debug;

use crate::error::{CalibrationError, Result};

/// Relative offset applied to non-zero coordinates of the starting point
const NONZERO_DELTA: f64 = 0.05;
/// Absolute offset applied to zero coordinates of the starting point
const ZERO_DELTA: f64 = 0.00025;

/// Termination settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    /// Standard deviation of the vertex costs below which the simplex has converged
    pub sd_tolerance: f64,
    pub max_iterations: u64,
}

/// Best vertex found, whether or not the tolerance was met
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: u64,
    pub converged: bool,
}

struct Objective<F>(F);

impl<F: Fn(&[f64]) -> f64> CostFunction for Objective<F> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        // NaN would poison the vertex ordering; treat it as the worst cost
        let value = (self.0)(param);
        Ok(if value.is_nan() { f64::INFINITY } else { value })
    }
}

/// Starting simplex: `x0` plus one vertex per coordinate, offset by 5% of
/// that coordinate (or 0.00025 when it is zero).
pub fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(x0.len() + 1);
    vertices.push(x0.to_vec());
    for i in 0..x0.len() {
        let mut v = x0.to_vec();
        v[i] = if v[i] != 0.0 {
            (1.0 + NONZERO_DELTA) * v[i]
        } else {
            ZERO_DELTA
        };
        vertices.push(v);
    }
    vertices
}

fn optimizer_error(e: Error) -> CalibrationError {
    CalibrationError::Optimizer {
        message: e.to_string(),
    }
}

/// Minimize `objective` starting from `x0`.
///
/// # Errors
///
/// `Optimizer` if argmin rejects the setup or aborts the run. Running out of
/// iterations is not an error; it yields `converged == false`.
pub fn minimize<F>(objective: F, x0: &[f64], options: SimplexOptions) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let solver = NelderMead::new(initial_simplex(x0))
        .with_sd_tolerance(options.sd_tolerance)
        .map_err(optimizer_error)?;
    let result = Executor::new(Objective(objective), solver)
        .configure(|state| state.max_iters(options.max_iterations))
        .run()
        .map_err(optimizer_error)?;

    let state = result.state();
    let x = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| CalibrationError::Optimizer {
            message: "no vertex was evaluated".to_string(),
        })?;
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    debug!(
        iterations = state.get_iter(),
        cost = state.get_best_cost(),
        status = ?state.get_termination_status(),
        "Nelder-Mead finished"
    );

    Ok(Minimum {
        x,
        value: state.get_best_cost(),
        iterations: state.get_iter(),
        converged,
    })
}
