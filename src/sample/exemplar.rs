//! Struct `Exemplar` represents one bag of the multiple-instance setting.
use serde::{Serialize, Deserialize};
use std::fmt;
use std::sync::Arc;

use crate::common::utils;
use crate::error::{MilkError, Result};
use super::attribute::Attribute;
use super::dataset::{self, Dataset, Header};
use super::instance::Instance;


/// A bag: an ordered set of weighted rows that share
/// one identifier value and one class label.
///
/// Every row of an `Exemplar` has the same value in the id column.
/// The class label of the bag is stored separately from the rows,
/// so [`Exemplar::set_class_value`] never touches row contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exemplar {
    header: Arc<Header>,
    id_index: usize,
    id_value: f64,
    class_index: usize,
    class_value: f64,
    rows: Vec<Instance>,
    weight: f64,
}


impl Exemplar {
    /// Construct a bag from a single row.
    /// The id and the class label of the bag are taken from `row`.
    pub fn new(
        header: Arc<Header>,
        id_index: usize,
        class_index: usize,
        row: Instance,
    ) -> Result<Self>
    {
        check_id_attribute(&header, id_index)?;
        header.attribute(class_index)?;
        header.check_instance(&row)?;

        let id_value = row.value(id_index);
        if id_value.is_nan() {
            return Err(MilkError::IncompatibleRow(
                "the id value of the row is missing".into()
            ));
        }
        let class_value = row.value(class_index);

        Ok(Self {
            header,
            id_index,
            id_value,
            class_index,
            class_value,
            rows: vec![row],
            weight: 1.0,
        })
    }


    /// Construct a bag from all rows of `dataset`.
    /// Every row must carry the same id value.
    pub fn from_dataset(dataset: &Dataset, id_index: usize) -> Result<Self> {
        let class_index = dataset.class_index()
            .ok_or(MilkError::ClassUnset)?;

        let mut rows = dataset.rows().iter();
        let first = rows.next()
            .ok_or_else(|| MilkError::IncompatibleRow(
                "cannot form a bag from an empty dataset".into()
            ))?;

        let header = Arc::clone(dataset.header());
        let mut bag = Self::new(header, id_index, class_index, first.clone())?;
        for row in rows {
            bag.add(row.clone())?;
        }
        Ok(bag)
    }


    /// Construct an empty bag with the same id, label, and schema.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            header: Arc::clone(&self.header),
            id_index: self.id_index,
            id_value: self.id_value,
            class_index: self.class_index,
            class_value: self.class_value,
            rows: Vec::new(),
            weight: self.weight,
        }
    }


    /// Appends a copy of `row` to this bag.
    /// Fails if the row does not fit the schema
    /// or carries a different id value.
    pub fn add(&mut self, row: Instance) -> Result<()> {
        self.header.check_instance(&row)?;
        let id = row.value(self.id_index);
        if !utils::eq(id, self.id_value) {
            return Err(MilkError::IncompatibleRow(format!(
                "id value `{}` does not match bag `{}`",
                self.id_attribute().format_value(id),
                self.id_label(),
            )));
        }
        self.rows.push(row);
        Ok(())
    }


    /// Returns `true` if `row` can be added to this bag.
    pub fn check_instance(&self, row: &Instance) -> bool {
        self.header.check_instance(row).is_ok()
            && utils::eq(row.value(self.id_index), self.id_value)
    }


    /// Returns the shared schema.
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }


    /// Returns the rows of this bag.
    pub fn instances(&self) -> &[Instance] {
        &self.rows[..]
    }


    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }


    /// Returns `true` if the bag has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }


    /// Returns the number of attributes, including id and class.
    pub fn num_attributes(&self) -> usize {
        self.header.num_attributes()
    }


    /// Returns the class attribute.
    pub fn class_attribute(&self) -> &Attribute {
        &self.header.attributes()[self.class_index]
    }


    /// Returns the class index.
    pub fn class_index(&self) -> usize {
        self.class_index
    }


    /// Returns the class value of the bag. `NaN` if unknown.
    pub fn class_value(&self) -> f64 {
        self.class_value
    }


    /// Returns the class label as an index,
    /// or `None` if the label is missing.
    pub fn class_label(&self) -> Option<usize> {
        if self.class_value.is_nan() {
            None
        } else {
            Some(self.class_value as usize)
        }
    }


    /// Overwrites the class value of the bag.
    /// The rows keep their own class cells.
    pub fn set_class_value(&mut self, class_value: f64) {
        self.class_value = class_value;
    }


    /// Returns the id attribute.
    pub fn id_attribute(&self) -> &Attribute {
        &self.header.attributes()[self.id_index]
    }


    /// Returns the id index.
    pub fn id_index(&self) -> usize {
        self.id_index
    }


    /// Returns the id value of the bag.
    pub fn id_value(&self) -> f64 {
        self.id_value
    }


    /// Returns the label of the id value.
    pub fn id_label(&self) -> String {
        self.id_attribute().format_value(self.id_value)
    }


    /// Returns the number of id labels the id attribute defines.
    pub fn num_ids(&self) -> usize {
        self.id_attribute().num_values()
    }


    /// Returns the bag weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }


    /// Set the bag weight.
    /// Row weights are left untouched.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }


    /// Returns the sum of the row weights.
    pub fn sum_of_weights(&self) -> f64 {
        dataset::sum_of_weights(&self.rows)
    }


    /// Returns the attribute indices other than the id and the class.
    pub fn feature_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_attributes())
            .filter(move |&i| i != self.id_index && i != self.class_index)
    }


    /// Returns `true` if every row misses the `index`-th value.
    pub fn is_all_missing(&self, index: usize) -> bool {
        self.rows.iter().all(|row| row.is_missing(index))
    }


    /// Returns the weighted mean (numeric) or mode (nominal)
    /// of every feature dimension, excluding the id and the class.
    /// A dimension with no usable value yields `NaN`.
    pub fn mean_or_mode(&self) -> Vec<f64> {
        let positive = utils::gr(self.sum_of_weights(), 0.0);
        self.feature_indices()
            .map(|i| {
                if !positive || self.is_all_missing(i) {
                    return f64::NAN;
                }
                let att = &self.header.attributes()[i];
                dataset::column_mean_or_mode(att, &self.rows, i)
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }


    /// Returns the weighted sample variance of every numeric dimension,
    /// excluding the id and the class.
    /// Non-numeric dimensions yield `-1`.
    pub fn variance(&self) -> Vec<f64> {
        self.feature_indices()
            .map(|i| {
                if self.header.attributes()[i].is_numeric() {
                    dataset::column_variance(&self.rows, i)
                } else {
                    -1.0
                }
            })
            .collect()
    }


    /// Returns the feature values of the `j`-th row,
    /// excluding the id and the class.
    pub fn features_of(&self, j: usize) -> Vec<f64> {
        let row = &self.rows[j];
        self.feature_indices()
            .map(|i| row.value(i))
            .collect()
    }


    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Instance> {
        &mut self.rows
    }


    pub(crate) fn set_header(&mut self, header: Arc<Header>) {
        self.header = header;
    }


    /// Removes the `position`-th column from every row and
    /// moves the id/class indices that follow it.
    pub(crate) fn delete_attribute_at(
        &mut self,
        position: usize,
        header: Arc<Header>,
    )
    {
        if self.class_index > position { self.class_index -= 1; }
        if self.id_index > position { self.id_index -= 1; }
        self.rows.iter_mut()
            .for_each(|row| row.delete_value_at(position));
        self.header = header;
    }
}


pub(crate) fn check_id_attribute(header: &Header, id_index: usize)
    -> Result<()>
{
    let id = header.attribute(id_index)?;
    if !id.is_nominal() {
        return Err(MilkError::IdNotNominal(id.name().to_string()));
    }
    Ok(())
}


impl fmt::Display for Exemplar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id_attribute();
        let cl = self.class_attribute();
        writeln!(f, "@Exemplar: ")?;
        writeln!(f, "ID: {} = {}", id.name(), self.id_label())?;
        writeln!(
            f, "Class: {} = {}\n",
            cl.name(),
            cl.format_value(self.class_value)
        )?;

        for (i, att) in self.header.attributes().iter().enumerate() {
            write!(f, "{att}")?;
            if i == self.id_index {
                write!(f, " (ID Attribute)")?;
            } else if i == self.class_index {
                write!(f, " (Class Attribute)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n@data")?;
        for row in self.rows.iter() {
            let line = self.header.attributes()
                .iter()
                .zip(row.values())
                .map(|(att, &x)| {
                    if att.is_numeric() && !x.is_nan() {
                        x.to_string()
                    } else {
                        att.format_value(x)
                    }
                })
                .collect::<Vec<_>>()
                .join(",");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
