//! A generator of artificial multiple-instance data
//! whose bag posterior is known in closed form.
use rand::prelude::*;
use rand_distr::Uniform;
use std::fmt;

use crate::error::{MilkError, Result};
use super::attribute::Attribute;
use super::dataset::Dataset;
use super::instance::Instance;


/// Generates bags around random centroids.
///
/// Each bag has a centroid drawn uniformly from `[-4, 4)` per dimension
/// and `1..=max_bag_size` instances drawn from a triangle-shaped density
/// (peaked at `0`) restricted to `[x0 - 1, x0 + 1)`.
/// The label of a bag is drawn from its exact posterior
/// under the log-odds coefficients `beta`.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// let population = PopulationGenerator::new(100, vec![2.0, -1.0])
///     .seed(1234)
///     .generate()?;
/// println!("{population}");
/// let bags = Exemplars::from_dataset(&population.dataset, 0)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PopulationGenerator {
    n_bags: usize,
    beta: Vec<f64>,
    seed: u64,
    max_bag_size: usize,
    relation: String,
}


/// The output of [`PopulationGenerator::generate`].
#[derive(Debug, Clone)]
pub struct Population {
    /// Rows with the layout `(id, t0, ..., t{d-1}, class)`.
    /// The class index is set.
    pub dataset: Dataset,
    /// Centroid of every bag.
    pub centroids: Vec<Vec<f64>>,
    /// Posterior probability of the positive class of every bag.
    pub posteriors: Vec<f64>,
    /// Number of bags labeled `0` whose posterior is at least `0.5`.
    pub wrong0: usize,
    /// Number of bags labeled `1` whose posterior is below `0.5`.
    pub wrong1: usize,
    /// Expected error of the Bayes classifier over the drawn centroids.
    pub bayes_error: f64,
}


impl PopulationGenerator {
    /// Construct a generator of `n_bags` bags
    /// with one dimension per coefficient in `beta`.
    pub fn new(n_bags: usize, beta: Vec<f64>) -> Self {
        Self {
            n_bags,
            beta,
            seed: 1234,
            max_bag_size: 5,
            relation: String::from("population"),
        }
    }


    /// Set the random seed. Default is `1234`.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }


    /// Set the largest bag size. Default is `5`.
    #[inline]
    pub fn max_bag_size(mut self, size: usize) -> Self {
        self.max_bag_size = size;
        self
    }


    /// Set the relation name.
    #[inline]
    pub fn relation<T: ToString>(mut self, name: T) -> Self {
        self.relation = name.to_string();
        self
    }


    /// Draws the population.
    pub fn generate(&self) -> Result<Population> {
        let dim = self.beta.len();
        if dim == 0 {
            return Err(MilkError::Build(
                "at least one coefficient is required".into()
            ));
        }
        if self.max_bag_size == 0 {
            return Err(MilkError::Build(
                "bags must hold at least one instance".into()
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let uniform = Uniform::new(-4.0, 4.0);

        let mut centroids = Vec::with_capacity(self.n_bags);
        let mut posteriors = Vec::with_capacity(self.n_bags);
        let mut labels = Vec::with_capacity(self.n_bags);
        let mut wrong0 = 0;
        let mut wrong1 = 0;
        let mut wrong = 0.0;
        for _ in 0..self.n_bags {
            let centroid = (0..dim)
                .map(|_| uniform.sample(&mut rng))
                .collect::<Vec<_>>();
            let prob = bag_posterior(&centroid, &self.beta);
            let label = if rng.gen::<f64>() > prob { 0 } else { 1 };

            if prob >= 0.5 {
                wrong += 1.0 - prob;
                if label == 0 { wrong0 += 1; }
            } else {
                wrong += prob;
                if label == 1 { wrong1 += 1; }
            }
            centroids.push(centroid);
            posteriors.push(prob);
            labels.push(label);
        }

        let ids = centroids.iter()
            .enumerate()
            .map(|(j, centroid)| {
                let coords = centroid.iter()
                    .map(|x| format!("{x:.2}"))
                    .collect::<Vec<_>>()
                    .join("_");
                format!("{j}_{coords}")
            })
            .collect::<Vec<_>>();

        let mut attributes = Vec::with_capacity(dim + 2);
        attributes.push(Attribute::nominal("exemplar", &ids));
        attributes.extend((0..dim).map(|k| Attribute::numeric(format!("t{k}"))));
        attributes.push(Attribute::nominal("class", &["0", "1"]));

        let mut dataset = Dataset::new(&self.relation, attributes)
            .with_class_index(dim + 1)?;
        for (j, (centroid, &label)) in centroids.iter().zip(&labels).enumerate() {
            let size = (rng.gen::<f64>() * self.max_bag_size as f64) as usize + 1;
            for _ in 0..size {
                let mut values = Vec::with_capacity(dim + 2);
                values.push(j as f64);
                values.extend(centroid.iter().map(|&x0| next_point(&mut rng, x0)));
                values.push(label as f64);
                dataset.push(Instance::new(values))?;
            }
        }

        let bayes_error = if self.n_bags == 0 {
            0.0
        } else {
            wrong / self.n_bags as f64
        };

        Ok(Population {
            dataset,
            centroids,
            posteriors,
            wrong0,
            wrong1,
            bayes_error,
        })
    }
}


impl Population {
    /// Error rate of predicting the more probable class
    /// against the drawn labels.
    pub fn best_prediction_error(&self) -> f64 {
        let n = self.posteriors.len();
        if n == 0 { return 0.0; }
        (self.wrong0 + self.wrong1) as f64 / n as f64
    }
}


impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Wrong 0 = {}, Wrong 1 = {}, \
            Best prediction error = {:5.2}% \
            asymptotic Bayes error = {:7.4}%",
            self.wrong0,
            self.wrong1,
            self.best_prediction_error() * 100.0,
            self.bayes_error * 100.0,
        )?;
        write!(f, "{} bags, {} instances", self.posteriors.len(), self.dataset.len())
    }
}


/// Posterior probability of the positive class for a bag with centroid `x`.
/// The log-odds is the sum over dimensions of `beta[z]` times
/// the expected instance value of the triangle density on `[x0 - 1, x0 + 1)`.
pub fn bag_posterior(x: &[f64], beta: &[f64]) -> f64 {
    let log_odds = x.iter()
        .zip(beta)
        .map(|(&x0, &b)| {
            if x0 >= 1.0 {
                b * (-3.0 * x0 * x0 + 15.0 * x0 - 1.0) / (-3.0 * x0 + 15.0)
            } else if x0 <= -1.0 {
                b * (3.0 * x0 * x0 + 15.0 * x0 + 1.0) / (3.0 * x0 + 15.0)
            } else {
                b * (x0 * x0 * x0 - 12.0 * x0) / (3.0 * x0 * x0 - 27.0)
            }
        })
        .sum::<f64>();
    1.0 / (1.0 + (-log_odds).exp())
}


/// Draws a point in `[x0 - 1, x0 + 1)` from the triangle density
/// `0.2 - 0.04 |x|` on `[-5, 5)`, by reflecting rejected draws.
fn next_point<R: Rng + ?Sized>(rng: &mut R, x0: f64) -> f64 {
    if x0 >= 1.0 {
        let point = rng.gen::<f64>() * 2.0 + (x0 - 1.0);
        if point <= x0 {
            point
        } else if rng.gen::<f64>() * (0.2 - 0.04 * x0) > 0.2 - 0.04 * point {
            2.0 * x0 - point
        } else {
            point
        }
    } else if x0 <= -1.0 {
        let point = rng.gen::<f64>() * 2.0 + (x0 - 1.0);
        if point >= x0 {
            point
        } else if rng.gen::<f64>() * (0.2 + 0.04 * x0) > 0.2 + 0.04 * point {
            2.0 * x0 - point
        } else {
            point
        }
    } else {
        let total = -0.08 * x0 * x0 + 0.72;
        let left = -0.04 * x0 * x0 - 0.32 * x0 + 0.36;

        if rng.gen::<f64>() * total <= left {
            let point = rng.gen::<f64>() * (1.0 - x0) + x0 - 1.0;
            if point >= (x0 - 1.0) / 2.0 {
                point
            } else if rng.gen::<f64>() * (0.2 + 0.02 * (x0 - 1.0)) > 0.2 + 0.04 * point {
                x0 - 1.0 - point
            } else {
                point
            }
        } else {
            let point = rng.gen::<f64>() * (1.0 + x0);
            if point <= (x0 + 1.0) / 2.0 {
                point
            } else if rng.gen::<f64>() * (0.2 - 0.02 * (x0 + 1.0)) > 0.2 - 0.04 * point {
                x0 + 1.0 - point
            } else {
                point
            }
        }
    }
}
