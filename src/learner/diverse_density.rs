//! The Diverse Density method.
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::debug;
use std::fmt;

use crate::{Exemplar, Exemplars, MIClassifier};
use crate::common::{checker, utils};
use crate::error::{MilkError, Result};
use crate::optimization::{Bfgs, FnObjective};
use super::Assumption;
use super::bag_matrix::{self, BagMatrix};
use super::milr::check_width;


/// Probabilities below this value are clamped.
const ZERO: f64 = 1e-6;
/// Upper bound on the number of BFGS runs chained from the last point
/// while the optimizer reports no convergence.
const MAX_ROUNDS: usize = 5;


/// Options of [`DiverseDensity`].
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiverseDensityOptions {
    /// Maximal number of BFGS iterations per run.
    pub max_iter: usize,
    /// Stopping tolerance of BFGS.
    pub tolerance: f64,
    /// How the instance probabilities make up the bag posterior.
    pub assumption: Assumption,
}


impl Default for DiverseDensityOptions {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tolerance: 1e-6,
            assumption: Assumption::Standard,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiverseDensityModel {
    // `[t_0, s_0, t_1, s_1, ...]`.
    params: Vec<f64>,
    nll: f64,
    feature_names: Vec<String>,
}


/// The Diverse Density (DD) classifier.
///
/// DD looks for a target point `t` with per-dimension scales `s`
/// that is close to some instance of every positive bag and
/// far from every instance of negative bags.
/// Each instance is positive with probability
/// `exp(-Σ_k s_k² (x_k - t_k)²)`.
/// Under [`Assumption::Standard`], the noisy-or model gives
/// ```txt
///     P(y = 0 | B) = Π_j (1 - exp(-Σ_k s_k² (x_jk - t_k)²)).
/// ```
/// Under [`Assumption::Collective`] (MDD),
/// the bag posterior is the mean of the instance probabilities:
/// ```txt
///     P(y = 1 | B) = (1/n) Σ_j exp(-Σ_k s_k² (x_jk - t_k)²).
/// ```
/// The optimizer restarts from every instance of the largest
/// positive bag(s) with all scales set to `1`
/// and keeps the solution with the lowest negative log-likelihood.
/// Missing values do not contribute to the distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiverseDensity {
    options: DiverseDensityOptions,
    model: Option<DiverseDensityModel>,
}


impl Default for DiverseDensity {
    fn default() -> Self {
        Self::new()
    }
}


impl DiverseDensity {
    /// Construct a new, unbuilt instance of `DiverseDensity`.
    pub fn new() -> Self {
        Self::from_options(DiverseDensityOptions::default())
    }


    /// Construct a new, unbuilt instance of `DiverseDensity`
    /// under the collective assumption (MDD).
    pub fn collective() -> Self {
        Self::new().assumption(Assumption::Collective)
    }


    /// Construct a new, unbuilt instance of `DiverseDensity` with `options`.
    pub fn from_options(options: DiverseDensityOptions) -> Self {
        Self { options, model: None, }
    }


    /// Set the bag assumption. Default is [`Assumption::Standard`].
    #[inline]
    pub fn assumption(mut self, assumption: Assumption) -> Self {
        self.options.assumption = assumption;
        self
    }


    /// Set the maximal number of iterations per BFGS run.
    #[inline]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.options.max_iter = max_iter;
        self
    }


    /// Set the BFGS tolerance.
    #[inline]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.options.tolerance = tolerance;
        self
    }


    /// Returns the options.
    pub fn options(&self) -> &DiverseDensityOptions {
        &self.options
    }


    /// Returns the target point, or `None` before training.
    pub fn target(&self) -> Option<Vec<f64>> {
        self.model.as_ref()
            .map(|model| model.params.iter().step_by(2).copied().collect())
    }


    /// Returns the scales, or `None` before training.
    pub fn scales(&self) -> Option<Vec<f64>> {
        self.model.as_ref()
            .map(|model| model.params.iter().skip(1).step_by(2).copied().collect())
    }


    /// Returns the negative log-likelihood of the training bags
    /// at the fitted parameters.
    pub fn negative_log_likelihood(&self) -> Option<f64> {
        self.model.as_ref().map(|model| model.nll)
    }
}


/// `1 - exp(-Σ_k s_k² (x_k - t_k)²)` and `exp(-Σ ...)`.
#[inline]
fn instance_terms(params: &[f64], x: &[f64]) -> (f64, f64) {
    let d = x.iter()
        .enumerate()
        .filter(|(_, xk)| !xk.is_nan())
        .map(|(k, xk)| {
            let diff = xk - params[2 * k];
            let s = params[2 * k + 1];
            diff * diff * s * s
        })
        .sum::<f64>();
    let e = (-d).exp();
    (1.0 - e, e)
}


fn objective(
    data: &[Vec<Vec<f64>>],
    labels: &[usize],
    weights: &[f64],
    assumption: Assumption,
    params: &[f64],
) -> f64
{
    data.par_iter()
        .zip(labels)
        .zip(weights)
        .map(|((bag, &y), &w)| {
            let loss = match (assumption, y) {
                (Assumption::Standard, 1) => {
                    let p0 = bag.iter()
                        .map(|x| instance_terms(params, x).0)
                        .product::<f64>();
                    -(1.0 - p0).max(ZERO).ln()
                },
                (Assumption::Standard, _) => {
                    bag.iter()
                        .map(|x| -instance_terms(params, x).0.max(ZERO).ln())
                        .sum::<f64>()
                },
                (Assumption::Collective, y) => {
                    let p1 = collective_posterior(params, bag);
                    let p = if y == 1 { p1 } else { 1.0 - p1 };
                    -p.max(ZERO).ln()
                },
            };
            w * loss
        })
        .sum::<f64>()
}


/// `(1/n) Σ_j exp(-Σ_k s_k² (x_jk - t_k)²)`.
fn collective_posterior(params: &[f64], bag: &[Vec<f64>]) -> f64 {
    let n = bag.len().max(1) as f64;
    bag.iter()
        .map(|x| instance_terms(params, x).1)
        .sum::<f64>() / n
}


fn gradient(
    data: &[Vec<Vec<f64>>],
    labels: &[usize],
    weights: &[f64],
    assumption: Assumption,
    params: &[f64],
) -> Vec<f64>
{
    let dim = params.len();
    data.par_iter()
        .zip(labels)
        .zip(weights)
        .map(|((bag, &y), &w)| {
            let mut g = vec![0.0; dim];
            let terms = bag.iter()
                .map(|x| instance_terms(params, x))
                .collect::<Vec<_>>();

            // Coefficient of the distance derivative of each instance.
            let coefs = match (assumption, y) {
                (Assumption::Standard, 1) => {
                    let p0 = terms.iter().map(|(ins, _)| ins).product::<f64>();
                    if 1.0 - p0 <= ZERO { return g; }
                    let factor = p0 / (1.0 - p0);
                    terms.iter()
                        .map(|&(ins, e)| factor * e / ins.max(ZERO))
                        .collect::<Vec<_>>()
                },
                (Assumption::Standard, _) => {
                    terms.iter()
                        .map(|&(ins, e)| if ins <= ZERO { 0.0 } else { -e / ins })
                        .collect::<Vec<_>>()
                },
                (Assumption::Collective, y) => {
                    let n = terms.len() as f64;
                    let p1 = terms.iter().map(|(_, e)| e).sum::<f64>() / n;
                    // d/dθ [-ln P1] = Σ e_j d'_j / (n P1),
                    // d/dθ [-ln (1 - P1)] = -Σ e_j d'_j / (n (1 - P1)).
                    let factor = if y == 1 {
                        if p1 <= ZERO { return g; }
                        1.0 / (n * p1)
                    } else {
                        if 1.0 - p1 <= ZERO { return g; }
                        -1.0 / (n * (1.0 - p1))
                    };
                    terms.iter()
                        .map(|&(_, e)| factor * e)
                        .collect::<Vec<_>>()
                },
            };

            for (x, coef) in bag.iter().zip(coefs) {
                for (k, &xk) in x.iter().enumerate() {
                    if xk.is_nan() { continue; }
                    let t = params[2 * k];
                    let s = params[2 * k + 1];
                    let diff = xk - t;
                    g[2 * k] -= coef * 2.0 * s * s * diff;
                    g[2 * k + 1] += coef * 2.0 * s * diff * diff;
                }
            }
            g.iter_mut().for_each(|gk| *gk *= w);
            g
        })
        .reduce(
            || vec![0.0; dim],
            |mut a, b| {
                a.iter_mut().zip(b).for_each(|(ai, bi)| *ai += bi);
                a
            },
        )
}


impl MIClassifier for DiverseDensity {
    fn name(&self) -> &str {
        match self.options.assumption {
            Assumption::Standard => "DD",
            Assumption::Collective => "MDD",
        }
    }


    fn build_classifier(&mut self, bags: &Exemplars) -> Result<()> {
        checker::check_binary_bags(bags)?;
        let matrix = BagMatrix::from_exemplars(bags);
        if matrix.n_positive() == 0 {
            return Err(MilkError::Build(format!(
                "{}: at least one non-empty positive bag is required",
                self.name(),
            )));
        }
        debug!(
            "{}: {} negative and {} positive bags",
            self.name(),
            matrix.n_negative(),
            matrix.n_positive(),
        );

        // Instances of the largest positive bag(s) are the starting points.
        let max_size = matrix.bags.iter()
            .zip(&matrix.labels)
            .filter(|&(_, &y)| y == 1)
            .map(|(bag, _)| bag.len())
            .max()
            .unwrap_or(0);
        let starts = matrix.bags.iter()
            .zip(&matrix.labels)
            .filter(|&(bag, &y)| y == 1 && bag.len() == max_size)
            .flat_map(|(bag, _)| bag.iter())
            .map(|x| {
                x.iter()
                    .flat_map(|&xk| [if xk.is_nan() { 0.0 } else { xk }, 1.0])
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let BagMatrix { bags: data, labels, weights, .. } = matrix;
        let assumption = self.options.assumption;
        let objective = FnObjective::new(
            |params: &[f64]| objective(&data, &labels, &weights, assumption, params),
            |params: &[f64]| gradient(&data, &labels, &weights, assumption, params),
        ).with_name(self.name());
        let bfgs = Bfgs::new()
            .max_iter(self.options.max_iter)
            .tolerance(self.options.tolerance);

        let mut best: Option<(Vec<f64>, f64)> = None;
        for (r, start) in starts.into_iter().enumerate() {
            let mut min = bfgs.minimize(&objective, start)?;
            let mut rounds = 1;
            while !min.converged && rounds < MAX_ROUNDS {
                min = bfgs.minimize(&objective, min.point)?;
                rounds += 1;
            }

            let improved = best.as_ref()
                .map_or(true, |(_, nll)| min.value < *nll);
            if improved {
                debug!("{}: restart {r} found a smaller NLL {:.6}", self.name(), min.value);
                best = Some((min.point, min.value));
            }
        }

        let (params, nll) = best.ok_or_else(|| MilkError::Build(format!(
            "{}: no starting point", self.name()
        )))?;
        self.model = Some(DiverseDensityModel {
            params,
            nll,
            feature_names: bag_matrix::feature_names(bags),
        });
        Ok(())
    }


    fn distribution_for_exemplar(&self, bag: &Exemplar) -> Result<Vec<f64>> {
        let model = self.model.as_ref()
            .ok_or_else(|| MilkError::NotBuilt(self.name().to_string()))?;
        check_width(bag, model.params.len() / 2)?;

        let rows = bag_matrix::instance_matrix(bag);
        match self.options.assumption {
            Assumption::Standard => {
                let p0 = rows.iter()
                    .map(|x| instance_terms(&model.params, x).0)
                    .product::<f64>();
                Ok(vec![p0, 1.0 - p0])
            },
            Assumption::Collective => {
                let p1 = collective_posterior(&model.params, &rows);
                Ok(vec![1.0 - p1, p1])
            },
        }
    }
}


impl fmt::Display for DiverseDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self.options.assumption {
            Assumption::Standard => "Diverse Density",
            Assumption::Collective => "Modified Diverse Density",
        };
        let Some(model) = &self.model else {
            return write!(f, "{result}: No model built yet.");
        };

        writeln!(f, "{result}\n\nCoefficients...\nVariable       Point       Scale")?;
        for (name, ts) in model.feature_names.iter().zip(model.params.chunks(2)) {
            writeln!(
                f,
                "{name} {} {}",
                utils::double_to_string(ts[0], 12, 4),
                utils::double_to_string(ts[1], 12, 4),
            )?;
        }
        Ok(())
    }
}
