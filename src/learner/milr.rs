//! Multiple-instance logistic regression.
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use std::fmt;

use crate::{Exemplar, Exemplars, MIClassifier};
use crate::common::{checker, utils};
use crate::error::{MilkError, Result};
use crate::optimization::{Bfgs, FnObjective, ObjectiveFunction};
use super::Assumption;
use super::bag_matrix::{self, BagMatrix};


/// Upper bound on the number of BFGS runs chained from the last point
/// while the optimizer reports no convergence.
const MAX_ROUNDS: usize = 5;


/// Options of [`Milr`].
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilrOptions {
    /// Ridge penalty on the coefficients (intercept excluded).
    pub ridge: f64,
    /// Maximal number of BFGS iterations per run.
    pub max_iter: usize,
    /// Stopping tolerance of BFGS.
    pub tolerance: f64,
    /// How the instance log-odds make up the bag posterior.
    pub assumption: Assumption,
}


impl Default for MilrOptions {
    fn default() -> Self {
        Self {
            ridge: 1e-6,
            max_iter: 200,
            tolerance: 1e-6,
            assumption: Assumption::Standard,
        }
    }
}


/// A fitted MILR model in the units of the training data.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MilrModel {
    // `[β0, β1, ..., βd]`.
    coefficients: Vec<f64>,
    // Replacement of missing values, per feature.
    means: Vec<f64>,
    feature_names: Vec<String>,
}


/// Multiple-instance logistic regression (MILR).
///
/// Each instance is positive with probability
/// `1 / (1 + exp(-(β0 + β·x)))`.
/// Under [`Assumption::Standard`],
/// a bag is negative if and only if all of its instances are negative:
/// ```txt
///     P(y = 0 | B) = Π_j 1 / (1 + exp(β0 + β·x_j)).
/// ```
/// Under [`Assumption::Collective`] (MILRGEOM),
/// the bag log-odds are the mean of the instance log-odds:
/// ```txt
///     P(y = 1 | B) = 1 / (1 + exp(-(β0 + β·x̄))),  x̄ = (1/n) Σ_j x_j.
/// ```
/// The coefficients minimize the negative log-likelihood
/// plus `ridge · Σ_k β_k²` on standardized features
/// and are mapped back to the raw units afterwards.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// # let population = PopulationGenerator::new(40, vec![2.0]).generate()?;
/// # let bags = Exemplars::from_dataset(&population.dataset, 0)?;
/// let mut milr = Milr::new()
///     .ridge(1e-4)
///     .max_iter(500);
/// milr.build_classifier(&bags)?;
/// println!("{milr}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milr {
    options: MilrOptions,
    model: Option<MilrModel>,
}


impl Default for Milr {
    fn default() -> Self {
        Self::new()
    }
}


impl Milr {
    /// Construct a new, unbuilt instance of `Milr`.
    pub fn new() -> Self {
        Self::from_options(MilrOptions::default())
    }


    /// Construct a new, unbuilt instance of `Milr`
    /// under the collective assumption (MILRGEOM).
    pub fn geometric() -> Self {
        Self::new().assumption(Assumption::Collective)
    }


    /// Construct a new, unbuilt instance of `Milr` with `options`.
    pub fn from_options(options: MilrOptions) -> Self {
        Self { options, model: None, }
    }


    /// Set the bag assumption. Default is [`Assumption::Standard`].
    #[inline]
    pub fn assumption(mut self, assumption: Assumption) -> Self {
        self.options.assumption = assumption;
        self
    }


    /// Set the ridge penalty. Default is `1e-6`.
    #[inline]
    pub fn ridge(mut self, ridge: f64) -> Self {
        self.options.ridge = ridge;
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
    pub fn options(&self) -> &MilrOptions {
        &self.options
    }


    /// Returns `[β0, β1, ..., βd]` in raw units,
    /// or `None` before training.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.model.as_ref()
            .map(|model| &model.coefficients[..])
    }


    /// Negative log-likelihood plus the ridge term.
    fn objective(
        data: &[Vec<Vec<f64>>],
        labels: &[usize],
        weights: &[f64],
        ridge: f64,
        assumption: Assumption,
        beta: &[f64],
    ) -> f64
    {
        let nll = data.par_iter()
            .zip(labels)
            .zip(weights)
            .map(|((bag, &y), &w)| {
                let loss = match assumption {
                    Assumption::Standard => standard_loss(beta, bag, y),
                    Assumption::Collective => collective_loss(beta, bag, y),
                };
                w * loss
            })
            .sum::<f64>();
        let penalty = beta[1..].iter()
            .map(|b| b * b)
            .sum::<f64>();
        nll + ridge * penalty
    }


    fn gradient(
        data: &[Vec<Vec<f64>>],
        labels: &[usize],
        weights: &[f64],
        ridge: f64,
        assumption: Assumption,
        beta: &[f64],
    ) -> Vec<f64>
    {
        let dim = beta.len();
        let mut grad = data.par_iter()
            .zip(labels)
            .zip(weights)
            .map(|((bag, &y), &w)| {
                let mut g = match assumption {
                    Assumption::Standard => standard_gradient(beta, bag, y),
                    Assumption::Collective => collective_gradient(beta, bag, y),
                };
                g.iter_mut().for_each(|gk| *gk *= w);
                g
            })
            .reduce(
                || vec![0.0; dim],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(ai, bi)| *ai += bi);
                    a
                },
            );
        grad[1..].iter_mut()
            .zip(&beta[1..])
            .for_each(|(g, b)| *g += 2.0 * ridge * b);
        grad
    }
}


impl MIClassifier for Milr {
    fn name(&self) -> &str {
        match self.options.assumption {
            Assumption::Standard => "MILR",
            Assumption::Collective => "MILRGEOM",
        }
    }


    fn build_classifier(&mut self, bags: &Exemplars) -> Result<()> {
        checker::check_binary_bags(bags)?;
        let BagMatrix {
            bags: mut data, labels, weights, n_features,
        } = BagMatrix::from_exemplars(bags);
        if data.is_empty() {
            return Err(MilkError::Build(format!(
                "{}: no labeled, non-empty bag to train on", self.name()
            )));
        }

        let (means, sds) = standardize(&mut data, n_features);

        let n1 = labels.iter().filter(|&&y| y == 1).count() as f64;
        let n0 = labels.len() as f64 - n1;
        debug!("{}: {n0} bags have class 0 and {n1} bags have class 1", self.name());

        let mut start = vec![0.0; n_features + 1];
        start[0] = ((n1 + 1.0) / (n0 + 1.0)).ln();

        let ridge = self.options.ridge;
        let assumption = self.options.assumption;
        let objective = FnObjective::new(
            |beta: &[f64]| {
                Self::objective(&data, &labels, &weights, ridge, assumption, beta)
            },
            |beta: &[f64]| {
                Self::gradient(&data, &labels, &weights, ridge, assumption, beta)
            },
        ).with_name(self.name());

        let bfgs = Bfgs::new()
            .max_iter(self.options.max_iter)
            .tolerance(self.options.tolerance);
        let mut min = bfgs.minimize(&objective, start)?;
        let mut rounds = 1;
        while !min.converged && rounds < MAX_ROUNDS {
            debug!("{}: {} iterations finished, not enough", self.name(), min.iterations);
            min = bfgs.minimize(&objective, min.point)?;
            rounds += 1;
        }
        info!(
            "{}: negative log-likelihood {:.6} after {rounds} run(s)",
            self.name(),
            objective.objective_value(&min.point),
        );

        let mut coefficients = min.point;
        for k in 0..n_features {
            if sds[k] > 0.0 {
                coefficients[k + 1] /= sds[k];
                coefficients[0] -= coefficients[k + 1] * means[k];
            }
        }

        self.model = Some(MilrModel {
            coefficients,
            means,
            feature_names: bag_matrix::feature_names(bags),
        });
        Ok(())
    }


    fn distribution_for_exemplar(&self, bag: &Exemplar) -> Result<Vec<f64>> {
        let model = self.model.as_ref()
            .ok_or_else(|| MilkError::NotBuilt(self.name().to_string()))?;
        check_width(bag, model.means.len())?;

        let rows = bag_matrix::instance_matrix(bag)
            .into_iter()
            .map(|mut x| {
                x.iter_mut()
                    .zip(&model.means)
                    .filter(|(xk, _)| xk.is_nan())
                    .for_each(|(xk, m)| *xk = *m);
                x
            })
            .collect::<Vec<_>>();

        match self.options.assumption {
            Assumption::Standard => {
                let s = rows.iter()
                    .map(|x| bag_matrix::softplus(linear(&model.coefficients, x)))
                    .sum::<f64>();
                let p0 = (-s).exp();
                Ok(vec![p0, 1.0 - p0])
            },
            Assumption::Collective => {
                let p1 = sigmoid(linear(&model.coefficients, &mean_row(&rows)));
                Ok(vec![1.0 - p1, p1])
            },
        }
    }
}


/// Standardizes every feature by the mean of bag means and
/// the standard deviation over bags.
/// Missing values are replaced by the mean.
/// Returns `(means, sds)`; features with zero deviation are left
/// unscaled and have `sd = 0`.
fn standardize(data: &mut [Vec<Vec<f64>>], n_features: usize)
    -> (Vec<f64>, Vec<f64>)
{
    let mut means = vec![0.0; n_features];
    let mut sds = vec![0.0; n_features];

    for k in 0..n_features {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut count = 0.0;
        for bag in data.iter() {
            let values = bag.iter()
                .map(|x| x[k])
                .filter(|v| !v.is_nan())
                .collect::<Vec<_>>();
            if values.is_empty() { continue; }
            let n = values.len() as f64;
            sum += values.iter().sum::<f64>() / n;
            sum_sq += values.iter().map(|v| v * v).sum::<f64>() / n;
            count += 1.0;
        }
        if count == 0.0 { continue; }

        let mean = sum / count;
        means[k] = mean;
        if count > 1.0 {
            let var = sum_sq / (count - 1.0) - mean * mean * count / (count - 1.0);
            let sd = var.max(0.0).sqrt();
            if sd.is_finite() && sd > 0.0 {
                sds[k] = sd;
            }
        }
    }

    for bag in data.iter_mut() {
        for x in bag.iter_mut() {
            for k in 0..n_features {
                if x[k].is_nan() {
                    x[k] = means[k];
                }
                if sds[k] > 0.0 {
                    x[k] = (x[k] - means[k]) / sds[k];
                }
            }
        }
    }
    (means, sds)
}


/// `-ln(1 - Π_j 1 / (1 + exp(η_j)))` for a positive bag,
/// `Σ_j ln(1 + exp(η_j))` for a negative one.
fn standard_loss(beta: &[f64], bag: &[Vec<f64>], y: usize) -> f64 {
    let s = bag.iter()
        .map(|z| bag_matrix::softplus(linear(beta, z)))
        .sum::<f64>();
    if y == 1 { -(-(-s).exp_m1()).ln() } else { s }
}


fn standard_gradient(beta: &[f64], bag: &[Vec<f64>], y: usize) -> Vec<f64> {
    let mut g = vec![0.0; beta.len()];
    let mut s = 0.0;
    for z in bag.iter() {
        let eta = linear(beta, z);
        s += bag_matrix::softplus(eta);
        let p = sigmoid(eta);
        g[0] += p;
        g[1..].iter_mut()
            .zip(z)
            .for_each(|(gk, zk)| *gk += p * zk);
    }
    // d/dβ [-ln(1 - Π 1 / (1 + e_j))] = -Σ p_j x_j / (Π (1 + e_j) - 1)
    let scale = if y == 1 { -1.0 / s.exp_m1() } else { 1.0 };
    g.iter_mut().for_each(|gk| *gk *= scale);
    g
}


/// `ln(1 + exp(∓η̄))` where `η̄` is the log-odds at the mean instance.
fn collective_loss(beta: &[f64], bag: &[Vec<f64>], y: usize) -> f64 {
    let eta = linear(beta, &mean_row(bag));
    if y == 1 {
        bag_matrix::softplus(-eta)
    } else {
        bag_matrix::softplus(eta)
    }
}


fn collective_gradient(beta: &[f64], bag: &[Vec<f64>], y: usize) -> Vec<f64> {
    let z = mean_row(bag);
    let eta = linear(beta, &z);
    let scale = if y == 1 { -sigmoid(-eta) } else { sigmoid(eta) };

    let mut g = Vec::with_capacity(beta.len());
    g.push(scale);
    g.extend(z.iter().map(|zk| scale * zk));
    g
}


/// Per-feature mean of the rows of a bag.
fn mean_row(bag: &[Vec<f64>]) -> Vec<f64> {
    let n = bag.len().max(1) as f64;
    let width = bag.first().map_or(0, |x| x.len());
    let mut mean = vec![0.0; width];
    for x in bag {
        mean.iter_mut()
            .zip(x)
            .for_each(|(m, xk)| *m += xk / n);
    }
    mean
}


/// `β0 + Σ β_{k+1} x_k`.
#[inline(always)]
fn linear(beta: &[f64], x: &[f64]) -> f64 {
    beta[0] + utils::inner_product(&beta[1..], x)
}


#[inline(always)]
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}


pub(super) fn check_width(bag: &Exemplar, n_features: usize) -> Result<()> {
    let width = bag.num_attributes().saturating_sub(2);
    if width != n_features {
        return Err(MilkError::IncompatibleRow(format!(
            "the model expects {n_features} features, bag `{}` has {width}",
            bag.id_label(),
        )));
    }
    Ok(())
}


impl fmt::Display for Milr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = "Modified Logistic Regression";
        let Some(model) = &self.model else {
            return write!(f, "{result}: No model built yet.");
        };

        writeln!(f, "{result}\n\nCoefficients...\nVariable      Coeff.")?;
        for (name, b) in model.feature_names.iter().zip(&model.coefficients[1..]) {
            writeln!(f, "{name} {}", utils::double_to_string(*b, 12, 4))?;
        }
        writeln!(
            f,
            "Intercept: {}",
            utils::double_to_string(model.coefficients[0], 10, 4),
        )?;

        writeln!(f, "\nOdds Ratios...\nVariable         O.R.")?;
        for (name, b) in model.feature_names.iter().zip(&model.coefficients[1..]) {
            let odds = b.exp();
            if odds > 1e10 {
                writeln!(f, " {name} {odds}")?;
            } else {
                writeln!(f, " {name} {}", utils::double_to_string(odds, 12, 4))?;
            }
        }
        Ok(())
    }
}
