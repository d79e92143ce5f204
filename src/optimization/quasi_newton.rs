//! This file defines the quasi-Newton minimizer
//! backed by the `liblbfgs` crate.
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::error::{MilkError, Result};
use super::objective_function::ObjectiveFunction;


/// Maximal number of trials in one line search.
const MAX_LINESEARCH: usize = 40;
/// Number of iterations the relative decrease of the objective
/// is measured over.
const PAST: usize = 10;


/// Line search algorithm used by [`Bfgs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineSearch {
    /// More-Thuente line search.
    MoreThuente,
    /// Backtracking with the Armijo condition.
    BacktrackingArmijo,
    /// Backtracking with the Wolfe condition.
    BacktrackingWolfe,
    /// Backtracking with the strong Wolfe condition.
    #[default]
    BacktrackingStrongWolfe,
}


impl LineSearch {
    fn to_liblbfgs_str(self) -> &'static str {
        match self {
            Self::MoreThuente => "MoreThuente",
            Self::BacktrackingArmijo => "BacktrackingArmijo",
            Self::BacktrackingWolfe => "BacktrackingWolfe",
            Self::BacktrackingStrongWolfe => "BacktrackingStrongWolfe",
        }
    }
}


/// The result of [`Bfgs::minimize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Minimum {
    /// The best point found.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// `true` if a stopping criterion was met
    /// before `max_iter` iterations.
    pub converged: bool,
}


/// The limited-memory BFGS quasi-Newton method.
///
/// `Bfgs` keeps no state between calls;
/// every [`Bfgs::minimize`] call starts a fresh `liblbfgs` run.
///
/// Stops when
/// - `|g| / max(1, |x|)` is below `tolerance`, or
/// - the relative decrease of the objective over the last
///   few iterations is below `tolerance`.
///
/// Trial points with a non-finite objective value are
/// reported to the line search as `+∞`, so the step is shortened.
/// A run that ends in a line search failure returns the best point
/// evaluated so far with `converged = false`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bfgs {
    max_iter: usize,
    tolerance: f64,
    line_search: LineSearch,
}


impl Default for Bfgs {
    fn default() -> Self {
        Self::new()
    }
}


impl Bfgs {
    /// Construct a new instance of `Bfgs`
    /// with `max_iter = 200` and `tolerance = 1e-6`.
    pub fn new() -> Self {
        Self {
            max_iter: 200,
            tolerance: 1e-6,
            line_search: LineSearch::default(),
        }
    }


    /// Set the maximal number of iterations.
    #[inline]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }


    /// Set the stopping tolerance.
    #[inline]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }


    /// Set the line search algorithm.
    /// Default is [`LineSearch::BacktrackingStrongWolfe`].
    #[inline]
    pub fn line_search(mut self, line_search: LineSearch) -> Self {
        self.line_search = line_search;
        self
    }


    /// Minimizes `objective` starting from `start`.
    ///
    /// Fails if the objective or its gradient is not finite at `start`,
    /// or if the gradient does not have one entry per parameter.
    pub fn minimize<O>(&self, objective: &O, start: Vec<f64>) -> Result<Minimum>
        where O: ObjectiveFunction + ?Sized,
    {
        let name = objective.name();
        let f0 = objective.objective_value(&start);
        if !f0.is_finite() {
            return Err(MilkError::Build(format!(
                "{name}: the objective is not finite at the starting point"
            )));
        }
        let g0 = checked_gradient(objective, &start)?;
        if g0.iter().any(|g| !g.is_finite()) {
            return Err(MilkError::Build(format!(
                "{name}: the gradient is not finite at the starting point"
            )));
        }
        if max_abs(&g0) < self.tolerance || self.max_iter == 0 {
            let converged = max_abs(&g0) < self.tolerance;
            return Ok(Minimum { point: start, value: f0, iterations: 0, converged, });
        }

        let mut best = (start.clone(), f0);
        let mut failure = None;
        let mut iterations = 0;

        let evaluate = |x: &[f64], gx: &mut [f64]| -> anyhow::Result<f64> {
            let fx = objective.objective_value(x);
            if !fx.is_finite() {
                gx.fill(0.0);
                return Ok(f64::INFINITY);
            }
            let grad = match checked_gradient(objective, x) {
                Ok(grad) => grad,
                Err(e) => {
                    let message = e.to_string();
                    failure = Some(e);
                    anyhow::bail!(message);
                },
            };
            if grad.iter().any(|g| !g.is_finite()) {
                gx.fill(0.0);
                return Ok(f64::INFINITY);
            }
            gx.copy_from_slice(&grad);

            if fx < best.1 {
                best.0.clear();
                best.0.extend_from_slice(x);
                best.1 = fx;
            }
            Ok(fx)
        };

        let progress = |prgr: &liblbfgs::Progress| -> bool {
            iterations = prgr.niter as usize;
            debug!(
                "{name}: iter {:>4}, f = {:.8}, |g| = {:.3e}",
                prgr.niter, prgr.fx, prgr.gnorm,
            );
            false
        };

        let mut x = start;
        let outcome = liblbfgs::lbfgs()
            .with_max_iterations(self.max_iter)
            .with_epsilon(self.tolerance)
            .with_fx_delta(self.tolerance, PAST)
            .with_max_linesearch(MAX_LINESEARCH)
            .with_linesearch_algorithm(self.line_search.to_liblbfgs_str())
            .minimize(&mut x, evaluate, progress);

        if let Some(e) = failure {
            return Err(e);
        }

        let (point, value) = best;
        let mut converged = match &outcome {
            Ok(_) => iterations < self.max_iter,
            Err(e) => {
                debug!("{name}: liblbfgs stopped after {iterations} iterations: {e}");
                false
            },
        };
        if !converged {
            let grad = checked_gradient(objective, &point)?;
            converged = max_abs(&grad) < self.tolerance;
        }
        if !converged {
            warn!(
                "{name}: stopped after {iterations} iterations without convergence \
                (f = {value})",
            );
        }

        Ok(Minimum { point, value, iterations, converged, })
    }
}


fn checked_gradient<O>(objective: &O, x: &[f64]) -> Result<Vec<f64>>
    where O: ObjectiveFunction + ?Sized,
{
    let grad = objective.gradient(x);
    if grad.len() != x.len() {
        return Err(MilkError::Build(format!(
            "{}: gradient has {} entries for {} parameters",
            objective.name(),
            grad.len(),
            x.len(),
        )));
    }
    Ok(grad)
}


fn max_abs(v: &[f64]) -> f64 {
    v.iter()
        .fold(0.0_f64, |acc, x| acc.max(x.abs()))
}
