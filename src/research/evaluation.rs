use tracing::{debug, info};
use std::fmt;

use crate::{Exemplar, Exemplars, MIClassifier};
use crate::classifier::predicted_class;
use crate::common::{checker, utils};
use crate::error::{MilkError, Result};
use super::cost_matrix::CostMatrix;
use super::cross_validation::CrossValidation;


const SHORT_ID_CHARS: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];


/// Accumulates the predictions of a bag classifier
/// and reports accuracy and error statistics.
///
/// Every evaluated bag contributes its weight.
/// The confusion matrix is indexed as `[actual][predicted]`.
/// A bag whose distribution has no positive entry is *unclassified*
/// and is counted neither as correct nor as incorrect.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// # let population = PopulationGenerator::new(50, vec![2.0]).generate()?;
/// # let bags = Exemplars::from_dataset(&population.dataset, 0)?;
/// let mut eval = MIEvaluation::new(&bags)?;
/// eval.cross_validate_model(&Milr::new(), &bags, 10)?;
/// println!("{}", eval.to_summary_string("=== Summary ===\n"));
/// println!("{}", eval.to_class_details_string("=== Detailed Accuracy By Class ===\n"));
/// println!("{}", eval.to_matrix_string("=== Confusion Matrix ===\n"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MIEvaluation {
    n_classes: usize,
    class_names: Vec<String>,
    cost_matrix: Option<CostMatrix>,
    num_folds: usize,

    confusion: Vec<Vec<f64>>,
    with_class: f64,
    unclassified: f64,
    missing_class: f64,
    correct: f64,
    incorrect: f64,
    total_cost: f64,

    sum_abs_err: f64,
    sum_sqr_err: f64,
    sum_prior_abs_err: f64,
    sum_prior_sqr_err: f64,

    priors: Vec<f64>,
    priors_sum: f64,
}


impl MIEvaluation {
    /// Construct a new evaluation for bags that share the schema of `bags`.
    /// The class priors are initialized from `bags`.
    ///
    /// Fails with `NonNominalClass` if the class attribute is not nominal.
    pub fn new(bags: &Exemplars) -> Result<Self> {
        checker::check_nominal_class(bags)?;

        let n_classes = bags.num_classes();
        let class_attribute = bags.class_attribute();
        let class_names = (0..n_classes)
            .map(|k| class_attribute.value(k).unwrap_or_default().to_string())
            .collect();

        let mut eval = Self {
            n_classes,
            class_names,
            cost_matrix: None,
            num_folds: 0,

            confusion: vec![vec![0.0; n_classes]; n_classes],
            with_class: 0.0,
            unclassified: 0.0,
            missing_class: 0.0,
            correct: 0.0,
            incorrect: 0.0,
            total_cost: 0.0,

            sum_abs_err: 0.0,
            sum_sqr_err: 0.0,
            sum_prior_abs_err: 0.0,
            sum_prior_sqr_err: 0.0,

            priors: Vec::new(),
            priors_sum: 0.0,
        };
        eval.set_priors(bags);
        Ok(eval)
    }


    /// Construct a new evaluation that also charges misclassification
    /// costs by `cost`.
    ///
    /// Fails if the size of `cost` differs from the number of classes.
    pub fn with_cost_matrix(bags: &Exemplars, cost: CostMatrix)
        -> Result<Self>
    {
        let mut eval = Self::new(bags)?;
        if cost.size() != eval.n_classes {
            return Err(MilkError::CostMatrix(format!(
                "cost matrix has size {}, but the class has {} values",
                cost.size(),
                eval.n_classes,
            )));
        }
        eval.cost_matrix = Some(cost);
        Ok(eval)
    }


    /// Reset the class priors to `1` per class
    /// and add the weight of every labeled bag in `train`.
    pub fn set_priors(&mut self, train: &Exemplars) {
        self.priors = vec![1.0; self.n_classes];
        self.priors_sum = self.n_classes as f64;
        for bag in train.iter() {
            self.update_priors(bag);
        }
    }


    /// Add the weight of `bag` to the prior of its class.
    /// Bags without a class label are ignored.
    pub fn update_priors(&mut self, bag: &Exemplar) {
        let Some(label) = bag.class_label() else { return; };
        if label >= self.n_classes { return; }

        let weight = bag.weight();
        self.priors[label] += weight;
        self.priors_sum += weight;
    }


    /// Performs a stratified `n_folds`-fold cross-validation.
    /// Each fold trains a clone of the (unbuilt) `template`.
    pub fn cross_validate_model<C>(
        &mut self,
        template: &C,
        bags: &Exemplars,
        n_folds: usize,
    ) -> Result<()>
        where C: MIClassifier + Clone,
    {
        self.cross_validate_with(|| Ok(template.clone()), bags, n_folds)
    }


    /// Performs a stratified `n_folds`-fold cross-validation.
    /// Each fold trains a fresh classifier made by `factory`.
    ///
    /// The first failing fold aborts the run.
    pub fn cross_validate_with<C, F>(
        &mut self,
        mut factory: F,
        bags: &Exemplars,
        n_folds: usize,
    ) -> Result<()>
        where C: MIClassifier,
              F: FnMut() -> Result<C>,
    {
        let mut cv = CrossValidation::new(bags, n_folds)?;
        for fold in 0..n_folds {
            let (train, test) = cv.fold_at(fold)?;
            self.set_priors(&train);

            let mut classifier = factory()?;
            classifier.build_classifier(&train)?;
            self.evaluate_model(&classifier, &test)?;
            debug!(
                "{}: fold {}/{n_folds} done, {:.4} % correct so far",
                classifier.name(),
                fold + 1,
                self.pct_correct(),
            );
        }
        self.num_folds = n_folds;
        info!(
            "{n_folds}-fold cross-validation: {:.4} % correct over {} bags",
            self.pct_correct(),
            self.with_class,
        );
        Ok(())
    }


    /// Evaluates `classifier` on every bag of `bags`
    /// and returns the predicted classes.
    pub fn evaluate_model<C>(&mut self, classifier: &C, bags: &Exemplars)
        -> Result<Vec<Option<usize>>>
        where C: MIClassifier + ?Sized,
    {
        bags.iter()
            .map(|bag| self.evaluate_model_once(classifier, bag))
            .collect()
    }


    /// Evaluates `classifier` on `bag` and returns the predicted class.
    /// `None` means that the bag is unclassified.
    pub fn evaluate_model_once<C>(&mut self, classifier: &C, bag: &Exemplar)
        -> Result<Option<usize>>
        where C: MIClassifier + ?Sized,
    {
        let dist = classifier.distribution_for_exemplar(bag)?;
        self.evaluate_distribution(&dist, bag)
    }


    /// Records the class distribution `dist` predicted for `bag`
    /// and returns the predicted class.
    ///
    /// Fails if `dist` does not have one finite entry per class.
    pub fn evaluate_distribution(&mut self, dist: &[f64], bag: &Exemplar)
        -> Result<Option<usize>>
    {
        if dist.len() != self.n_classes {
            return Err(MilkError::Distribution(format!(
                "expected {} entries, got {}", self.n_classes, dist.len()
            )));
        }
        if dist.iter().any(|p| !p.is_finite()) {
            return Err(MilkError::Distribution(format!(
                "non-finite entry in {dist:?}"
            )));
        }

        let predicted = predicted_class(dist);
        let weight = bag.weight();
        let actual = match bag.class_label() {
            Some(label) if label < self.n_classes => label,
            _ => {
                self.missing_class += weight;
                return Ok(predicted);
            },
        };

        self.with_class += weight;

        if let Some(cost) = &self.cost_matrix {
            self.total_cost += match predicted {
                Some(p) => weight * cost.get_element(actual, p),
                None => weight * cost.max_cost(actual),
            };
        }

        let Some(predicted) = predicted else {
            self.unclassified += weight;
            return Ok(None);
        };

        self.update_numeric_scores(dist, actual, weight);

        self.confusion[actual][predicted] += weight;
        if actual == predicted {
            self.correct += weight;
        } else {
            self.incorrect += weight;
        }
        Ok(Some(predicted))
    }


    fn update_numeric_scores(&mut self, dist: &[f64], actual: usize, weight: f64) {
        let n = self.n_classes as f64;
        let (mut abs, mut sqr) = (0.0, 0.0);
        let (mut prior_abs, mut prior_sqr) = (0.0, 0.0);
        for k in 0..self.n_classes {
            let target = if k == actual { 1.0 } else { 0.0 };

            let diff = dist[k] - target;
            abs += diff.abs();
            sqr += diff * diff;

            let diff = self.priors[k] / self.priors_sum - target;
            prior_abs += diff.abs();
            prior_sqr += diff * diff;
        }
        self.sum_abs_err += weight * abs / n;
        self.sum_sqr_err += weight * sqr / n;
        self.sum_prior_abs_err += weight * prior_abs / n;
        self.sum_prior_sqr_err += weight * prior_sqr / n;
    }


    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.n_classes
    }


    /// Names of the class values.
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }


    /// Number of folds of the last cross-validation,
    /// or `0` if no cross-validation was run.
    pub fn num_folds(&self) -> usize {
        self.num_folds
    }


    /// The current class priors (counts, not probabilities).
    pub fn class_priors(&self) -> &[f64] {
        &self.priors
    }


    /// The cost matrix, if any.
    pub fn cost_matrix(&self) -> Option<&CostMatrix> {
        self.cost_matrix.as_ref()
    }


    /// The confusion matrix, indexed as `[actual][predicted]`.
    pub fn confusion_matrix(&self) -> &[Vec<f64>] {
        &self.confusion
    }


    /// Total weight of the evaluated bags with a known class,
    /// unclassified ones included.
    pub fn num_exemplars(&self) -> f64 {
        self.with_class
    }


    /// Total weight of correctly classified bags.
    pub fn correct(&self) -> f64 {
        self.correct
    }


    /// Total weight of incorrectly classified bags.
    pub fn incorrect(&self) -> f64 {
        self.incorrect
    }


    /// Total weight of unclassified bags.
    pub fn unclassified(&self) -> f64 {
        self.unclassified
    }


    /// Total weight of bags without a class label.
    pub fn missing_class(&self) -> f64 {
        self.missing_class
    }


    fn pct(&self, x: f64) -> f64 {
        if self.with_class > 0.0 { 100.0 * x / self.with_class } else { 0.0 }
    }


    /// Percentage of correctly classified bags.
    pub fn pct_correct(&self) -> f64 {
        self.pct(self.correct)
    }


    /// Percentage of incorrectly classified bags.
    pub fn pct_incorrect(&self) -> f64 {
        self.pct(self.incorrect)
    }


    /// Percentage of unclassified bags.
    pub fn pct_unclassified(&self) -> f64 {
        self.pct(self.unclassified)
    }


    /// Total misclassification cost.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }


    /// Average misclassification cost per bag.
    pub fn avg_cost(&self) -> f64 {
        if self.with_class > 0.0 { self.total_cost / self.with_class } else { 0.0 }
    }


    /// The average cost if a cost matrix is set,
    /// the fraction of incorrectly classified bags otherwise.
    pub fn error_rate(&self) -> f64 {
        if self.cost_matrix.is_some() {
            return self.avg_cost();
        }
        if self.with_class > 0.0 { self.incorrect / self.with_class } else { 0.0 }
    }


    /// Cohen's kappa of the confusion matrix.
    /// Returns `1` when the chance agreement is `1`.
    pub fn kappa(&self) -> f64 {
        let n = self.n_classes;
        let mut sum_rows = vec![0.0; n];
        let mut sum_columns = vec![0.0; n];
        let mut total = 0.0;
        for i in 0..n {
            for j in 0..n {
                sum_rows[i] += self.confusion[i][j];
                sum_columns[j] += self.confusion[i][j];
                total += self.confusion[i][j];
            }
        }
        if total <= 0.0 { return 0.0; }

        let correct = (0..n)
            .map(|i| self.confusion[i][i])
            .sum::<f64>() / total;
        let chance = sum_rows.iter()
            .zip(&sum_columns)
            .map(|(r, c)| r * c)
            .sum::<f64>() / (total * total);

        if chance < 1.0 {
            (correct - chance) / (1.0 - chance)
        } else {
            1.0
        }
    }


    /// Weight of bags of class `c` predicted as `c`.
    pub fn num_true_positives(&self, c: usize) -> f64 {
        if c >= self.n_classes { return 0.0; }
        self.confusion[c][c]
    }


    /// Weight of bags of other classes predicted as `c`.
    pub fn num_false_positives(&self, c: usize) -> f64 {
        if c >= self.n_classes { return 0.0; }
        (0..self.n_classes)
            .filter(|&i| i != c)
            .map(|i| self.confusion[i][c])
            .sum()
    }


    /// Weight of bags of other classes not predicted as `c`.
    pub fn num_true_negatives(&self, c: usize) -> f64 {
        if c >= self.n_classes { return 0.0; }
        (0..self.n_classes)
            .filter(|&i| i != c)
            .flat_map(|i| {
                (0..self.n_classes)
                    .filter(|&j| j != c)
                    .map(move |j| self.confusion[i][j])
            })
            .sum()
    }


    /// Weight of bags of class `c` predicted as another class.
    pub fn num_false_negatives(&self, c: usize) -> f64 {
        if c >= self.n_classes { return 0.0; }
        (0..self.n_classes)
            .filter(|&j| j != c)
            .map(|j| self.confusion[c][j])
            .sum()
    }


    /// `TP / (TP + FN)` for class `c`.
    pub fn true_positive_rate(&self, c: usize) -> f64 {
        ratio(self.num_true_positives(c), self.num_false_negatives(c))
    }


    /// `FP / (FP + TN)` for class `c`.
    pub fn false_positive_rate(&self, c: usize) -> f64 {
        ratio(self.num_false_positives(c), self.num_true_negatives(c))
    }


    /// `TN / (FP + TN)` for class `c`.
    pub fn true_negative_rate(&self, c: usize) -> f64 {
        ratio(self.num_true_negatives(c), self.num_false_positives(c))
    }


    /// `FN / (TP + FN)` for class `c`.
    pub fn false_negative_rate(&self, c: usize) -> f64 {
        ratio(self.num_false_negatives(c), self.num_true_positives(c))
    }


    /// Recall of class `c`, the same as the true positive rate.
    pub fn recall(&self, c: usize) -> f64 {
        self.true_positive_rate(c)
    }


    /// Precision of class `c`.
    pub fn precision(&self, c: usize) -> f64 {
        ratio(self.num_true_positives(c), self.num_false_positives(c))
    }


    /// Harmonic mean of the precision and the recall of class `c`.
    pub fn f_measure(&self, c: usize) -> f64 {
        let p = self.precision(c);
        let r = self.recall(c);
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }


    /// Mean absolute error of the predicted distributions.
    /// Unclassified bags add no error but count in the denominator.
    pub fn mean_absolute_error(&self) -> f64 {
        let n = self.with_class;
        if n > 0.0 { self.sum_abs_err / n } else { 0.0 }
    }


    /// Root mean squared error of the predicted distributions.
    pub fn root_mean_squared_error(&self) -> f64 {
        let n = self.with_class;
        if n > 0.0 { (self.sum_sqr_err / n).sqrt() } else { 0.0 }
    }


    /// Mean absolute error of the prior distribution.
    pub fn mean_prior_absolute_error(&self) -> f64 {
        let n = self.with_class;
        if n > 0.0 { self.sum_prior_abs_err / n } else { 0.0 }
    }


    /// Root mean squared error of the prior distribution.
    pub fn root_mean_prior_squared_error(&self) -> f64 {
        let n = self.with_class;
        if n > 0.0 { (self.sum_prior_sqr_err / n).sqrt() } else { 0.0 }
    }


    /// Mean absolute error relative to the prior, in percent.
    pub fn relative_absolute_error(&self) -> f64 {
        let prior = self.mean_prior_absolute_error();
        if prior > 0.0 { 100.0 * self.mean_absolute_error() / prior } else { 0.0 }
    }


    /// Root mean squared error relative to the prior, in percent.
    pub fn root_relative_squared_error(&self) -> f64 {
        let prior = self.root_mean_prior_squared_error();
        if prior > 0.0 { 100.0 * self.root_mean_squared_error() / prior } else { 0.0 }
    }


    /// Renders the overall statistics below `title`.
    pub fn to_summary_string(&self, title: &str) -> String {
        let mut text = format!("{title}\n");
        let d = |v: f64| utils::double_to_string(v, 12, 4);

        if self.with_class > 0.0 {
            text += &format!(
                "Correctly Classified Exemplars     {}     {} %\n",
                d(self.correct), d(self.pct_correct()),
            );
            text += &format!(
                "Incorrectly Classified Exemplars   {}     {} %\n",
                d(self.incorrect), d(self.pct_incorrect()),
            );
            text += &format!(
                "Kappa statistic                    {}\n",
                d(self.kappa()),
            );
            if self.cost_matrix.is_some() {
                text += &format!(
                    "Total Cost                         {}\n",
                    d(self.total_cost()),
                );
                text += &format!(
                    "Average Cost                       {}\n",
                    d(self.avg_cost()),
                );
            }
            text += &format!(
                "Mean absolute error                {}\n",
                d(self.mean_absolute_error()),
            );
            text += &format!(
                "Root mean squared error            {}\n",
                d(self.root_mean_squared_error()),
            );
            text += &format!(
                "Relative absolute error            {} %\n",
                d(self.relative_absolute_error()),
            );
            text += &format!(
                "Root relative squared error        {} %\n",
                d(self.root_relative_squared_error()),
            );
        }
        if self.unclassified > 0.0 {
            text += &format!(
                "UnClassified Exemplars             {}     {} %\n",
                d(self.unclassified), d(self.pct_unclassified()),
            );
        }
        text += &format!(
            "Total Number of Exemplars          {}\n",
            d(self.with_class),
        );
        if self.missing_class > 0.0 {
            text += &format!(
                "Ignored Class Unknown Exemplars            {}\n",
                d(self.missing_class),
            );
        }
        text
    }


    /// Renders the confusion matrix below `title`.
    /// Classes are labeled `a`, `b`, ... as in
    /// ```txt
    ///  a b   <-- classified as
    ///  5 0 | a = neg
    ///  5 0 | b = pos
    /// ```
    pub fn to_matrix_string(&self, title: &str) -> String {
        let mut max_value = 0.0_f64;
        let mut fractional = false;
        for row in &self.confusion {
            for &v in row {
                let mut current = v;
                if current < 0.0 { current *= -10.0; }
                max_value = max_value.max(current);
                let fract = current - rint(current);
                if !fractional && fract > 0.0 && fract.log10() >= -2.0 {
                    fractional = true;
                }
            }
        }

        let digits = if max_value > 0.0 {
            let extra = if fractional { 3.0 } else { 0.0 };
            (max_value.log10() + extra) as i64
        } else {
            0
        };
        let letters = ((self.n_classes as f64).ln() / 26_f64.ln()) as i64;
        let id_width = 1 + digits.max(letters).max(0) as usize;

        let mut text = format!("{title}\n");
        for i in 0..self.n_classes {
            if fractional {
                let id = num_to_short_id(i, id_width.saturating_sub(3));
                text += &format!(" {id}   ");
            } else {
                text += &format!(" {}", num_to_short_id(i, id_width));
            }
        }
        text += "   <-- classified as\n";

        let after_decimal = if fractional { 2 } else { 0 };
        for (i, row) in self.confusion.iter().enumerate() {
            for &v in row {
                text += " ";
                text += &utils::double_to_string(v, id_width, after_decimal);
            }
            text += &format!(
                " | {} = {}\n",
                num_to_short_id(i, id_width),
                self.class_names[i],
            );
        }
        text
    }


    /// Renders the per-class rates below `title`.
    pub fn to_class_details_string(&self, title: &str) -> String {
        let mut text = format!(
            "{title}\nTP Rate   FP Rate   Precision   Recall  F-Measure   Class\n"
        );
        let d = |v: f64| utils::double_to_string(v, 7, 3);
        for (c, name) in self.class_names.iter().enumerate() {
            text += &format!(
                "{}   {}    {}   {}   {}    {name}\n",
                d(self.true_positive_rate(c)),
                d(self.false_positive_rate(c)),
                d(self.precision(c)),
                d(self.recall(c)),
                d(self.f_measure(c)),
            );
        }
        text
    }
}


impl fmt::Display for MIEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_summary_string("=== Summary ===\n"))
    }
}


/// `a / (a + b)`, or `0` if the denominator is zero.
#[inline(always)]
fn ratio(a: f64, b: f64) -> f64 {
    if a + b == 0.0 { 0.0 } else { a / (a + b) }
}


/// Rounds half to even.
#[inline(always)]
fn rint(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}


/// A letter-based id of `num` (`a`, `b`, ..., `z`, `aa`, ...)
/// right-aligned in `width` characters.
/// Only the last `width` letters are kept.
pub(crate) fn num_to_short_id(mut num: usize, width: usize) -> String {
    let mut id = vec![' '; width];
    for slot in id.iter_mut().rev() {
        *slot = SHORT_ID_CHARS[num % 26];
        if num / 26 == 0 { break; }
        num = num / 26 - 1;
    }
    id.into_iter().collect()
}
