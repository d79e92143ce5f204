//! The contract between bag classifiers and the evaluation harness.
//!
//! A bag classifier is trained on an [`Exemplars`]
//! and returns a class distribution for each [`Exemplar`].
use crate::{Exemplar, Exemplars};
use crate::error::Result;

/// Defines a name-based registry of classifiers.
pub mod registry;

pub use registry::{ClassifierRegistry, Constructor};


/// A trait that defines the behavior of multiple-instance classifiers.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// let population = PopulationGenerator::new(40, vec![2.0]).generate()?;
/// let bags = Exemplars::from_dataset(&population.dataset, 0)?;
/// let mut milr = Milr::new().ridge(1e-4);
/// milr.build_classifier(&bags)?;
/// let dist = milr.distribution_for_exemplar(&bags[0])?;
/// assert_eq!(dist.len(), 2);
/// # Ok(())
/// # }
/// ```
pub trait MIClassifier {
    /// The name of the classifier.
    fn name(&self) -> &str;


    /// Trains this classifier on `bags`.
    /// Building twice replaces the first model.
    fn build_classifier(&mut self, bags: &Exemplars) -> Result<()>;


    /// Returns the class distribution for `bag`.
    /// The `k`-th entry is the probability of the `k`-th class value.
    fn distribution_for_exemplar(&self, bag: &Exemplar) -> Result<Vec<f64>>;


    /// Returns the most probable class of `bag`.
    /// Ties are broken in favor of the smaller class index.
    /// Returns `None` if no class has a positive probability.
    fn classify_exemplar(&self, bag: &Exemplar) -> Result<Option<usize>> {
        let dist = self.distribution_for_exemplar(bag)?;
        Ok(predicted_class(&dist))
    }
}


impl<C> MIClassifier for Box<C>
    where C: MIClassifier + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn build_classifier(&mut self, bags: &Exemplars) -> Result<()> {
        (**self).build_classifier(bags)
    }

    fn distribution_for_exemplar(&self, bag: &Exemplar) -> Result<Vec<f64>> {
        (**self).distribution_for_exemplar(bag)
    }

    fn classify_exemplar(&self, bag: &Exemplar) -> Result<Option<usize>> {
        (**self).classify_exemplar(bag)
    }
}


/// Index of the first strictly largest positive entry of `dist`.
pub(crate) fn predicted_class(dist: &[f64]) -> Option<usize> {
    let mut best = 0.0;
    let mut class = None;
    for (k, &p) in dist.iter().enumerate() {
        if p > best {
            best = p;
            class = Some(k);
        }
    }
    class
}
