//! Struct `Exemplars` holds an ordered collection of bags
//! sharing one schema.
use rand::prelude::*;
use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::common::{utils, checker};
use crate::error::{MilkError, Result};
use super::attribute::Attribute;
use super::bag_stats::BagStats;
use super::dataset::{Dataset, Header};
use super::exemplar::{self, Exemplar};
use super::instance::Instance;


/// An ordered collection of [`Exemplar`]s with the dataset-level
/// metadata: the attribute schema, the id index, and the class index.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// let population = PopulationGenerator::new(20, vec![2.0]).generate()?;
/// let bags = Exemplars::from_dataset(&population.dataset, 0)?;
/// let mut copy = bags.clone();
/// copy.stratify(5)?;
/// let train = copy.train_cv(5, 0)?;
/// let test = copy.test_cv(5, 0)?;
/// assert_eq!(train.len() + test.len(), bags.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exemplars {
    header: Arc<Header>,
    id_index: usize,
    class_index: usize,
    exemplars: Vec<Exemplar>,

    // id value -> position of the first bag with that id.
    #[serde(skip)]
    positions: HashMap<usize, usize>,
    #[serde(skip)]
    indexed: bool,
}


impl Exemplars {
    /// Construct an empty collection over the given schema.
    pub fn new(header: Arc<Header>, id_index: usize, class_index: usize)
        -> Result<Self>
    {
        exemplar::check_id_attribute(&header, id_index)?;
        header.attribute(class_index)?;
        Ok(Self {
            header,
            id_index,
            class_index,
            exemplars: Vec::new(),
            positions: HashMap::new(),
            indexed: true,
        })
    }


    /// Groups the rows of `dataset` into bags by the value of
    /// the `id_index`-th column.
    /// Bags appear in the order their first row appears.
    pub fn from_dataset(dataset: &Dataset, id_index: usize) -> Result<Self> {
        let class_index = dataset.class_index()
            .ok_or(MilkError::ClassUnset)?;
        let header = Arc::clone(dataset.header());

        let mut bags = Self::new(header, id_index, class_index)?;
        for row in dataset.rows() {
            bags.add_instance(row.clone())?;
        }
        Ok(bags)
    }


    /// Construct an empty collection with the same schema.
    pub fn empty_like(&self) -> Self {
        self.with_exemplars(Vec::new())
    }


    fn with_exemplars(&self, exemplars: Vec<Exemplar>) -> Self {
        Self {
            header: Arc::clone(&self.header),
            id_index: self.id_index,
            class_index: self.class_index,
            exemplars,
            positions: HashMap::new(),
            indexed: false,
        }
    }


    fn reindex(&mut self) {
        self.positions.clear();
        for (pos, bag) in self.exemplars.iter().enumerate() {
            self.positions.entry(bag.id_value() as usize).or_insert(pos);
        }
        self.indexed = true;
    }


    fn position_of(&mut self, id_value: f64) -> Option<usize> {
        if !self.indexed {
            self.reindex();
        }
        self.positions.get(&(id_value as usize)).copied()
    }


    /// Adds a row to the bag with the same id.
    /// If no such bag exists, a new bag of weight `1.0` is created.
    pub fn add_instance(&mut self, row: Instance) -> Result<()> {
        self.header.check_instance(&row)?;
        let id_value = row.value(self.id_index);
        if id_value.is_nan() {
            return Err(MilkError::IncompatibleRow(
                "the id value of the row is missing".into()
            ));
        }

        match self.position_of(id_value) {
            Some(pos) => self.exemplars[pos].add(row),
            None => {
                let header = Arc::clone(&self.header);
                let bag = Exemplar::new(
                    header, self.id_index, self.class_index, row
                )?;
                self.push_indexed(bag);
                Ok(())
            },
        }
    }


    /// Adds a copy of `bag`.
    /// Fails if the attributes of `bag` differ from those of the collection
    /// (names, kinds and value tables)
    /// or if a bag with the same id already exists.
    pub fn add_exemplar(&mut self, bag: &Exemplar) -> Result<()> {
        if bag.header().attributes() != self.header.attributes()
            || bag.id_index() != self.id_index
            || bag.class_index() != self.class_index
        {
            return Err(MilkError::IncompatibleRow(format!(
                "bag `{}` does not share the schema of the collection",
                bag.id_label(),
            )));
        }
        if self.position_of(bag.id_value()).is_some() {
            return Err(MilkError::DuplicateId(bag.id_label()));
        }

        let mut bag = bag.clone();
        bag.set_header(Arc::clone(&self.header));
        self.push_indexed(bag);
        Ok(())
    }


    fn push_indexed(&mut self, bag: Exemplar) {
        let pos = self.exemplars.len();
        self.positions.entry(bag.id_value() as usize).or_insert(pos);
        self.exemplars.push(bag);
    }


    /// Returns the shared schema.
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }


    /// Returns the relation name.
    pub fn relation_name(&self) -> &str {
        self.header.relation()
    }


    /// Set the relation name.
    pub fn set_relation_name<T: ToString>(&mut self, name: T) {
        Arc::make_mut(&mut self.header).set_relation(name);
        self.share_header();
    }


    /// Returns the `index`-th attribute.
    pub fn attribute(&self, index: usize) -> Result<&Attribute> {
        self.header.attribute(index)
    }


    /// Returns the first attribute named `name`.
    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.header.attribute_by_name(name)
    }


    /// Returns the number of attributes, including id and class.
    pub fn num_attributes(&self) -> usize {
        self.header.num_attributes()
    }


    /// Returns `true` if any attribute is a text (string) attribute.
    pub fn check_for_string_attributes(&self) -> bool {
        self.header.attributes().iter().any(|att| att.is_text())
    }


    /// Returns the class attribute.
    pub fn class_attribute(&self) -> &Attribute {
        &self.header.attributes()[self.class_index]
    }


    /// Returns the class index.
    pub fn class_index(&self) -> usize {
        self.class_index
    }


    /// Returns the id attribute.
    pub fn id_attribute(&self) -> &Attribute {
        &self.header.attributes()[self.id_index]
    }


    /// Returns the id index.
    pub fn id_index(&self) -> usize {
        self.id_index
    }


    /// Returns the number of classes.
    /// A non-nominal class counts as a single class.
    pub fn num_classes(&self) -> usize {
        let class = self.class_attribute();
        if class.is_nominal() { class.num_values() } else { 1 }
    }


    /// Returns the number of bags.
    pub fn len(&self) -> usize {
        self.exemplars.len()
    }


    /// Returns `true` if the collection holds no bag.
    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }


    /// Returns the `index`-th bag.
    pub fn exemplar(&self, index: usize) -> Option<&Exemplar> {
        self.exemplars.get(index)
    }


    /// Returns a mutable reference to the `index`-th bag.
    pub fn exemplar_mut(&mut self, index: usize) -> Option<&mut Exemplar> {
        self.exemplars.get_mut(index)
    }


    /// Returns the bags as a slice.
    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars[..]
    }


    /// Returns an iterator over the bags.
    pub fn iter(&self) -> std::slice::Iter<'_, Exemplar> {
        self.exemplars.iter()
    }


    /// Returns the first bag.
    pub fn first(&self) -> Option<&Exemplar> {
        self.exemplars.first()
    }


    /// Returns the last bag.
    pub fn last(&self) -> Option<&Exemplar> {
        self.exemplars.last()
    }


    /// Removes the `index`-th bag.
    pub fn delete(&mut self, index: usize) -> Option<Exemplar> {
        if index >= self.exemplars.len() { return None; }
        self.indexed = false;
        Some(self.exemplars.remove(index))
    }


    /// Removes every bag.
    pub fn clear(&mut self) {
        self.exemplars.clear();
        self.positions.clear();
        self.indexed = true;
    }


    /// Returns the number of rows of every bag.
    pub fn nums_instances(&self) -> Vec<usize> {
        self.exemplars.iter()
            .map(|bag| bag.len())
            .collect()
    }


    /// Returns the sum of row weights of every bag.
    pub fn sums_of_weights(&self) -> Vec<f64> {
        self.exemplars.iter()
            .map(|bag| bag.sum_of_weights())
            .collect()
    }


    /// Returns the bag weights.
    pub fn weights(&self) -> Vec<f64> {
        self.exemplars.iter()
            .map(|bag| bag.weight())
            .collect()
    }


    /// Returns descriptive statistics of the bag sizes.
    pub fn bag_stats(&self) -> BagStats {
        BagStats::from_exemplars(self)
    }


    /// Removes the `position`-th column from the schema and every bag.
    /// The id and class indices that follow `position` are shifted.
    /// Deleting the id or class column itself is refused.
    pub fn delete_attribute_at(&mut self, position: usize) -> Result<()> {
        self.header.attribute(position)?;
        if position == self.id_index {
            return Err(MilkError::ProtectedAttribute("id"));
        }
        if position == self.class_index {
            return Err(MilkError::ProtectedAttribute("class"));
        }

        Arc::make_mut(&mut self.header).delete_attribute_at(position);
        let header = Arc::clone(&self.header);
        self.exemplars.iter_mut()
            .for_each(|bag| {
                bag.delete_attribute_at(position, Arc::clone(&header))
            });

        if self.class_index > position { self.class_index -= 1; }
        if self.id_index > position { self.id_index -= 1; }
        Ok(())
    }


    /// Removes every text (string) attribute.
    pub fn delete_string_attributes(&mut self) -> Result<()> {
        let mut i = 0;
        while i < self.num_attributes() {
            if self.header.attributes()[i].is_text() {
                self.delete_attribute_at(i)?;
            } else {
                i += 1;
            }
        }
        Ok(())
    }


    /// Removes every row that misses the `index`-th value.
    /// Bags left without rows are discarded.
    pub fn delete_with_missing(&mut self, index: usize) -> Result<()> {
        self.header.attribute(index)?;
        self.exemplars.iter_mut()
            .for_each(|bag| bag.rows_mut().retain(|row| !row.is_missing(index)));
        self.exemplars.retain(|bag| !bag.is_empty());
        self.indexed = false;
        Ok(())
    }


    /// Renames the `index`-th attribute.
    pub fn rename_attribute<T: ToString>(&mut self, index: usize, name: T)
        -> Result<()>
    {
        Arc::make_mut(&mut self.header).rename_attribute(index, name)?;
        self.share_header();
        Ok(())
    }


    fn share_header(&mut self) {
        let header = Arc::clone(&self.header);
        self.exemplars.iter_mut()
            .for_each(|bag| bag.set_header(Arc::clone(&header)));
    }


    /// Shuffles the bags in place (Fisher-Yates):
    /// for `j` from `n - 1` down to `1`,
    /// swap bag `j` with a uniformly chosen bag in `[0, j]`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let n = self.exemplars.len();
        for j in (1..n).rev() {
            let k = rng.gen_range(0..=j);
            self.exemplars.swap(j, k);
        }
        self.indexed = false;
    }


    /// Sorts the bags by id value.
    pub fn sort(&mut self) {
        self.exemplars
            .sort_by(|a, b| a.id_value().total_cmp(&b.id_value()));
        self.indexed = false;
    }


    /// Draws `n` bags uniformly with replacement.
    pub fn resample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let n = self.exemplars.len();
        let exemplars = (0..n)
            .map(|_| {
                let j = (rng.gen::<f64>() * n as f64) as usize;
                self.exemplars[j.min(n - 1)].clone()
            })
            .collect();
        self.with_exemplars(exemplars)
    }


    /// Draws `n` bags with replacement,
    /// with probability proportional to the bag weights.
    /// Every drawn bag has weight `1.0`.
    pub fn resample_with_weights<R: Rng + ?Sized>(&self, rng: &mut R)
        -> Result<Self>
    {
        let weights = self.weights();
        self.resample_with_given_weights(rng, &weights)
    }


    /// Draws `n` bags with replacement,
    /// with probability proportional to `weights`.
    /// Every drawn bag has weight `1.0`.
    pub fn resample_with_given_weights<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        weights: &[f64],
    ) -> Result<Self>
    {
        let n = weights.len();
        if n != self.exemplars.len() {
            return Err(MilkError::Weights(format!(
                "got {n} weights for {} bags", self.exemplars.len()
            )));
        }
        if weights.iter().any(|&w| w < 0.0 || w.is_nan()) {
            return Err(MilkError::Weights(
                "weights have to be non-negative".into()
            ));
        }
        if n == 0 { return Ok(self.empty_like()); }

        let sum_of_weights = weights.iter().sum::<f64>();
        if sum_of_weights <= 0.0 {
            return Err(MilkError::Weights(
                "the sum of weights has to be positive".into()
            ));
        }

        // Sorted uniform draws scaled to `[0, sum_of_weights]`.
        let mut sum_probs = 0.0;
        let mut probabilities = (0..n)
            .map(|_| {
                sum_probs += rng.gen::<f64>();
                sum_probs
            })
            .collect::<Vec<_>>();
        utils::normalize(&mut probabilities, sum_probs / sum_of_weights);
        probabilities[n - 1] = sum_of_weights;

        let mut exemplars = Vec::with_capacity(n);
        let mut k = 0;
        let mut cumulative = 0.0;
        for (l, &w) in weights.iter().enumerate() {
            if k >= n { break; }
            cumulative += w;
            while k < n && probabilities[k] <= cumulative {
                let mut bag = self.exemplars[l].clone();
                bag.set_weight(1.0);
                exemplars.push(bag);
                k += 1;
            }
        }
        Ok(self.with_exemplars(exemplars))
    }


    /// Reorders the bags so that
    /// every fold of a subsequent `n_folds`-fold split
    /// has (almost) the class proportions of the whole collection.
    ///
    /// Bags of the same class are first grouped together,
    /// then dealt round-robin over `n_folds` buckets.
    /// Collections with a non-nominal class are left as they are.
    pub fn stratify(&mut self, n_folds: usize) -> Result<()> {
        if n_folds == 0 {
            return Err(MilkError::InvalidFold(
                "number of folds must be greater than 0".into()
            ));
        }
        if !self.class_attribute().is_nominal() { return Ok(()); }

        let n = self.exemplars.len();
        let mut index = 1;
        while index < n {
            let class = self.exemplars[index - 1].class_value();
            for j in index..n {
                if self.exemplars[j].class_value() == class {
                    self.exemplars.swap(index, j);
                    index += 1;
                }
            }
            index += 1;
        }

        self.strat_step(n_folds);
        self.indexed = false;
        Ok(())
    }


    /// Deals the bags round-robin: positions `0, k, 2k, ...`,
    /// then `1, 1 + k, ...`, and so on.
    fn strat_step(&mut self, n_folds: usize) {
        let n = self.exemplars.len();
        let order = (0..n_folds.min(n))
            .flat_map(|start| (start..n).step_by(n_folds))
            .collect::<Vec<_>>();

        let mut slots = std::mem::take(&mut self.exemplars)
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>();
        self.exemplars = order.into_iter()
            .filter_map(|i| slots[i].take())
            .collect();
    }


    /// Returns the pair `(first, size)` of the `fold`-th test block.
    fn fold_bounds(&self, n_folds: usize, fold: usize)
        -> Result<(usize, usize)>
    {
        let n = self.exemplars.len();
        checker::check_fold(n_folds, fold, n)?;
        Ok(fold_bounds(n, n_folds, fold))
    }


    /// Returns the test bags of the `fold`-th fold out of `n_folds`.
    /// The first `n % n_folds` folds hold `n / n_folds + 1` bags,
    /// the others `n / n_folds`.
    pub fn test_cv(&self, n_folds: usize, fold: usize) -> Result<Self> {
        let (first, size) = self.fold_bounds(n_folds, fold)?;
        let exemplars = self.exemplars[first..first + size].to_vec();
        Ok(self.with_exemplars(exemplars))
    }


    /// Returns the training bags of the `fold`-th fold out of `n_folds`,
    /// i.e., every bag not in [`Exemplars::test_cv`].
    pub fn train_cv(&self, n_folds: usize, fold: usize) -> Result<Self> {
        let (first, size) = self.fold_bounds(n_folds, fold)?;
        let exemplars = self.exemplars[..first].iter()
            .chain(&self.exemplars[first + size..])
            .cloned()
            .collect();
        Ok(self.with_exemplars(exemplars))
    }


    /// Same as [`Exemplars::train_cv`] followed by
    /// [`Exemplars::randomize`].
    pub fn train_cv_randomized<R: Rng + ?Sized>(
        &self,
        n_folds: usize,
        fold: usize,
        rng: &mut R,
    ) -> Result<Self>
    {
        let mut train = self.train_cv(n_folds, fold)?;
        train.randomize(rng);
        Ok(train)
    }
}


/// `(first, size)` of the `fold`-th test block of `n` items.
/// The caller guarantees `2 <= n_folds <= n` and `fold < n_folds`.
pub(crate) fn fold_bounds(n: usize, n_folds: usize, fold: usize)
    -> (usize, usize)
{
    let base = n / n_folds;
    let rest = n % n_folds;
    if fold < rest {
        (fold * base + fold, base + 1)
    } else {
        (fold * base + rest, base)
    }
}


impl Index<usize> for Exemplars {
    type Output = Exemplar;
    fn index(&self, idx: usize) -> &Self::Output {
        &self.exemplars[idx]
    }
}


impl<'a> IntoIterator for &'a Exemplars {
    type Item = &'a Exemplar;
    type IntoIter = std::slice::Iter<'a, Exemplar>;
    fn into_iter(self) -> Self::IntoIter {
        self.exemplars.iter()
    }
}


impl fmt::Display for Exemplars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@relation {}\n", self.relation_name())?;
        for (i, att) in self.header.attributes().iter().enumerate() {
            write!(f, "{att}")?;
            if i == self.id_index {
                write!(f, " (ID Attribute)")?;
            } else if i == self.class_index {
                write!(f, " (Class Attribute)")?;
            }
            writeln!(f)?;
        }

        let id = self.id_attribute();
        let cl = self.class_attribute();
        writeln!(
            f,
            "\n@Exemplars: \nID({}); Class({}); Weight; sumOfInstances'Weights",
            id.name(),
            cl.name(),
        )?;
        for bag in self.exemplars.iter() {
            writeln!(
                f,
                "{}; {}; {}; {}",
                bag.id_label(),
                cl.format_value(bag.class_value()),
                bag.weight(),
                bag.sum_of_weights(),
            )?;
        }
        write!(f, "There are totally {} exemplars", self.len())
    }
}
