#![warn(missing_docs)]

//!
//! A crate that provides multiple-instance learning (MIL) tools.
//! In MIL, a class label is attached to a *bag* of rows
//! instead of a single row.
//!
//! This crate includes
//!
//! - The bag model
//!     A flat [`Dataset`] is grouped into bags ([`Exemplar`])
//!     by a nominal id column.
//!     [`Exemplars`] holds the bags of one dataset and supports
//!     stratification, fold partitioning, and resampling.
//!
//!
//! - The evaluation harness
//!     [`MIEvaluation`] accumulates the predictions of a bag classifier
//!     (accuracy, kappa, per-class rates, error and cost statistics)
//!     and runs stratified cross-validation.
//!     [`CrossValidation`] iterates over train/test pairs.
//!
//!
//! - Bag classifiers
//!     Every classifier implements [`MIClassifier`].
//!     In this crate,
//!     [`Milr`] (multiple-instance logistic regression) and
//!     [`DiverseDensity`] are available,
//!     each under the standard or the collective [`Assumption`],
//!     and [`ClassifierRegistry`] maps names to them.
//!
//! # Example
//! ```no_run
//! use milk::prelude::*;
//!
//! # fn main() -> milk::Result<()> {
//! let population = PopulationGenerator::new(100, vec![2.0, -1.0])
//!     .seed(1234)
//!     .generate()?;
//! let bags = Exemplars::from_dataset(&population.dataset, 0)?;
//!
//! let mut eval = MIEvaluation::new(&bags)?;
//! eval.cross_validate_model(&Milr::new(), &bags, 10)?;
//! println!("{eval}");
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod sample;
pub mod optimization;
pub mod classifier;
pub mod learner;
pub mod research;
pub mod error;
pub mod prelude;


pub use sample::{
    Attribute,
    AttributeKind,
    Instance,
    Dataset,
    Header,
    Exemplar,
    Exemplars,
    BagStats,
    DatasetReader,
    PopulationGenerator,
    Population,
};


pub use classifier::{MIClassifier, ClassifierRegistry};


pub use learner::{
    Milr,
    MilrOptions,
    DiverseDensity,
    DiverseDensityOptions,
    Assumption,
};


pub use optimization::{Bfgs, LineSearch, Minimum};


pub use research::{
    CostMatrix,
    CrossValidation,
    MIEvaluation,
};


pub use error::{MilkError, Result};
