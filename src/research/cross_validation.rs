use rand::prelude::*;
use colored::Colorize;
use tracing::{debug, warn};

use crate::Exemplars;
use crate::common::checker;
use crate::error::Result;

use std::iter::Iterator;

const WIDTH: usize = 9;

/// A struct that generates
/// pairs of training/test bags for `k`-fold cross validation.
///
/// By default, the bags are stratified (not shuffled) before splitting,
/// so that every fold has almost the class proportions of the whole set.
/// Every bag appears in exactly one test fold.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// # let population = PopulationGenerator::new(50, vec![2.0]).generate()?;
/// # let bags = Exemplars::from_dataset(&population.dataset, 0)?;
/// let cv = CrossValidation::new(&bags, 10)?
///     .verbose(true)
///     .seed(777)
///     .shuffle();
/// for (train, test) in cv {
///     let mut milr = Milr::new();
///     milr.build_classifier(&train)?;
///     let mut eval = MIEvaluation::new(&train)?;
///     eval.evaluate_model(&milr, &test)?;
///     println!("{}", eval.pct_correct());
/// }
/// # Ok(())
/// # }
/// ```
pub struct CrossValidation<'a> {
    bags: &'a Exemplars,
    prepared: Option<Exemplars>,
    current_fold: usize,
    n_folds: usize,
    seed: u64,
    shuffle: bool,
    stratify: bool,
    verbose: bool,
}


impl<'a> CrossValidation<'a> {
    /// Construct a new instance of `CrossValidation`.
    /// Fails if `n_folds < 2` or `n_folds` exceeds the number of bags.
    #[inline]
    pub fn new(bags: &'a Exemplars, n_folds: usize) -> Result<Self> {
        checker::check_fold(n_folds, 0, bags.len())?;
        Ok(Self {
            bags,
            prepared: None,
            current_fold: 0,
            n_folds,
            seed: 1234,
            shuffle: false,
            stratify: true,
            verbose: false,
        })
    }


    /// Set the seed of the randomness for shuffling.
    /// Default vaule is `1234`.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }


    /// Shuffle the bags before stratification.
    /// By default, `CrossValidation` does not shuffle the bags.
    #[inline]
    pub fn shuffle(mut self) -> Self {
        self.shuffle = true;
        self.prepared = None;
        self
    }


    /// Set the stratification flag.
    /// Default value is `true`.
    #[inline]
    pub fn stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self.prepared = None;
        self
    }


    /// Set the verbose parameter.
    /// If `true`, `CrossValidation` prints some information
    /// when generating a train/test pair.
    /// Default vaule is `false`.
    #[inline]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }


    /// Returns the number of folds.
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }


    /// Returns the reordered copy of the bags that folds are cut from.
    pub fn reordered(&mut self) -> Result<&Exemplars> {
        if self.prepared.is_none() {
            let mut bags = self.bags.clone();
            if self.shuffle {
                let mut rng = StdRng::seed_from_u64(self.seed);
                bags.randomize(&mut rng);
            }
            if self.stratify {
                bags.stratify(self.n_folds)?;
            }
            self.prepared = Some(bags);
        }
        Ok(self.prepared.get_or_insert_with(|| self.bags.clone()))
    }


    /// Returns the training/test bags for the `fold`-th fold.
    pub fn fold_at(&mut self, fold: usize) -> Result<(Exemplars, Exemplars)> {
        let n_folds = self.n_folds;
        let bags = self.reordered()?;
        let train = bags.train_cv(n_folds, fold)?;
        let test = bags.test_cv(n_folds, fold)?;
        Ok((train, test))
    }
}


impl<'a> Iterator for CrossValidation<'a> {
    type Item = (Exemplars, Exemplars);
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_fold >= self.n_folds { return None; }

        let output = match self.fold_at(self.current_fold) {
            Ok(output) => output,
            Err(e) => {
                warn!("fold {}/{} failed: {e}", self.current_fold + 1, self.n_folds);
                return None;
            },
        };
        self.current_fold += 1;

        debug!(
            "fold {}/{}: {} training bags, {} test bags",
            self.current_fold,
            self.n_folds,
            output.0.len(),
            output.1.len(),
        );
        if self.verbose {
            let train_size = output.0.len();
            let test_size = output.1.len();
            println!(
                "{}    {}    {}",
                format!("  [{: >3}'th fold]", self.current_fold).bold().red(),
                format!("[TRAIN {:>WIDTH$}]", train_size).bold().green(),
                format!("[TEST {:>WIDTH$}]", test_size).bold().yellow(),
            );
        }

        Some(output)
    }
}
