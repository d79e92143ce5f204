//! Likelihood-based multiple-instance classifiers.
//!
//! Each classifier is built under one of two assumptions
//! on how the instances of a bag make up its label, see [`Assumption`].
use serde::{Serialize, Deserialize};

// Extraction of feature matrices from bags.
pub(crate) mod bag_matrix;

/// Defines multiple-instance logistic regression.
pub mod milr;

/// Defines the Diverse Density method.
pub mod diverse_density;


pub use milr::{Milr, MilrOptions};
pub use diverse_density::{DiverseDensity, DiverseDensityOptions};


/// How the instance-level model is lifted to a bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Assumption {
    /// The standard MI assumption:
    /// a bag is negative if and only if all of its instances are negative.
    #[default]
    Standard,
    /// The collective assumption:
    /// every instance contributes equally to the label of its bag.
    /// MILR averages the log-odds of the instances
    /// (the geometric mean of the instance posteriors, MILRGEOM)
    /// and DD averages the instance probabilities (MDD).
    Collective,
}
