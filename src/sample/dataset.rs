use serde::{Serialize, Deserialize};
use std::sync::Arc;

use crate::common::utils;
use crate::error::{MilkError, Result};
use super::attribute::Attribute;
use super::instance::Instance;


/// The schema shared by a dataset and every bag built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    relation: String,
    attributes: Vec<Attribute>,
}


impl Header {
    /// Construct a new header.
    pub fn new<T: ToString>(relation: T, attributes: Vec<Attribute>) -> Self {
        Self { relation: relation.to_string(), attributes, }
    }


    /// Returns the relation name.
    pub fn relation(&self) -> &str {
        &self.relation
    }


    pub(crate) fn set_relation<T: ToString>(&mut self, relation: T) {
        self.relation = relation.to_string();
    }


    /// Returns the attributes.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes[..]
    }


    /// Returns the `index`-th attribute.
    pub fn attribute(&self, index: usize) -> Result<&Attribute> {
        let len = self.attributes.len();
        self.attributes.get(index)
            .ok_or(MilkError::AttributeOutOfRange { index, len })
    }


    /// Returns the first attribute named `name`.
    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter()
            .find(|att| att.name() == name)
    }


    /// Returns the number of attributes.
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }


    /// Returns `Ok(())` if `row` fits this header.
    pub fn check_instance(&self, row: &Instance) -> Result<()> {
        if row.num_values() != self.attributes.len() {
            return Err(MilkError::IncompatibleRow(format!(
                "expected {} values, got {}",
                self.attributes.len(),
                row.num_values(),
            )));
        }

        let illegal = self.attributes.iter()
            .zip(row.values())
            .find(|(att, &x)| !att.accepts(x));
        if let Some((att, x)) = illegal {
            return Err(MilkError::IncompatibleRow(format!(
                "value {x} is not legal for attribute `{}`", att.name()
            )));
        }
        Ok(())
    }


    pub(crate) fn delete_attribute_at(&mut self, position: usize) {
        self.attributes.remove(position);
    }


    pub(crate) fn rename_attribute<T: ToString>(
        &mut self,
        index: usize,
        name: T,
    ) -> Result<()>
    {
        let len = self.attributes.len();
        self.attributes.get_mut(index)
            .ok_or(MilkError::AttributeOutOfRange { index, len })?
            .set_name(name);
        Ok(())
    }
}


/// A flat table of weighted rows with an optional class column.
/// Bags are formed from a `Dataset` by
/// [`Exemplars::from_dataset`](crate::Exemplars::from_dataset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    header: Arc<Header>,
    class_index: Option<usize>,
    rows: Vec<Instance>,
}


impl Dataset {
    /// Construct an empty dataset with the given schema.
    pub fn new<T: ToString>(relation: T, attributes: Vec<Attribute>) -> Self {
        let header = Arc::new(Header::new(relation, attributes));
        Self { header, class_index: None, rows: Vec::new(), }
    }


    /// Set the class column.
    pub fn with_class_index(mut self, index: usize) -> Result<Self> {
        self.set_class_index(index)?;
        Ok(self)
    }


    /// Set the class column.
    pub fn set_class_index(&mut self, index: usize) -> Result<()> {
        self.header.attribute(index)?;
        self.class_index = Some(index);
        Ok(())
    }


    /// Appends a row after checking it against the header.
    pub fn push(&mut self, row: Instance) -> Result<()> {
        self.header.check_instance(&row)?;
        self.rows.push(row);
        Ok(())
    }


    /// Returns the shared header.
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }


    /// Returns the `index`-th attribute.
    pub fn attribute(&self, index: usize) -> Result<&Attribute> {
        self.header.attribute(index)
    }


    /// Returns the number of attributes.
    pub fn num_attributes(&self) -> usize {
        self.header.num_attributes()
    }


    /// Returns the class index, if set.
    pub fn class_index(&self) -> Option<usize> {
        self.class_index
    }


    /// Returns the class attribute.
    pub fn class_attribute(&self) -> Result<&Attribute> {
        let index = self.class_index.ok_or(MilkError::ClassUnset)?;
        self.header.attribute(index)
    }


    /// Returns the rows.
    pub fn rows(&self) -> &[Instance] {
        &self.rows[..]
    }


    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }


    /// Returns `true` if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }


    /// Returns the sum of the row weights.
    pub fn sum_of_weights(&self) -> f64 {
        sum_of_weights(&self.rows)
    }


    /// Returns `true` if any attribute is a text attribute.
    pub fn check_for_text_attributes(&self) -> bool {
        self.header.attributes().iter().any(|att| att.is_text())
    }


    /// Weighted mean (numeric) or mode (nominal) of a column.
    /// Returns `0` if every value is missing.
    pub fn mean_or_mode(&self, index: usize) -> Result<f64> {
        let att = self.header.attribute(index)?;
        Ok(column_mean_or_mode(att, &self.rows, index).unwrap_or(0.0))
    }


    /// Weighted sample variance of a numeric column.
    pub fn variance(&self, index: usize) -> Result<f64> {
        let att = self.header.attribute(index)?;
        if !att.is_numeric() {
            return Err(MilkError::Build(format!(
                "variance of non-numeric attribute `{}`", att.name()
            )));
        }
        Ok(column_variance(&self.rows, index))
    }
}


pub(crate) fn sum_of_weights(rows: &[Instance]) -> f64 {
    rows.iter()
        .map(|row| row.weight())
        .sum::<f64>()
}


/// Mean or mode of column `index` over `rows`.
/// Returns `None` for text columns and for columns with no usable value.
pub(crate) fn column_mean_or_mode(
    att: &Attribute,
    rows: &[Instance],
    index: usize,
) -> Option<f64>
{
    let pairs = rows.iter()
        .map(|row| (row.value(index), row.weight()));

    if att.is_numeric() {
        utils::weighted_mean(pairs)
    } else if att.is_nominal() {
        if rows.iter().all(|row| row.is_missing(index)) {
            return None;
        }
        Some(utils::weighted_mode(pairs, att.num_values()) as f64)
    } else {
        None
    }
}


pub(crate) fn column_variance(rows: &[Instance], index: usize) -> f64 {
    let pairs = rows.iter()
        .map(|row| (row.value(index), row.weight()));
    utils::weighted_variance(pairs)
}
