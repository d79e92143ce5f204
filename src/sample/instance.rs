use serde::{Serialize, Deserialize};


/// A weighted row of cell values.
/// Missing cells hold `f64::NAN`;
/// nominal cells hold the index of their value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    values: Vec<f64>,
    weight: f64,
}


impl Instance {
    /// Construct a row with weight `1.0`.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, weight: 1.0, }
    }


    /// Set the row weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }


    /// The marker stored in a missing cell.
    #[inline(always)]
    pub fn missing_value() -> f64 {
        f64::NAN
    }


    /// Returns the value of the `i`-th cell.
    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        self.values[i]
    }


    /// Returns all cell values.
    pub fn values(&self) -> &[f64] {
        &self.values[..]
    }


    /// Returns `true` if the `i`-th cell is missing.
    #[inline]
    pub fn is_missing(&self, i: usize) -> bool {
        self.values[i].is_nan()
    }


    /// Returns the number of cells.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }


    /// Returns the row weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }


    /// Set the row weight.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }


    /// Overwrites the `i`-th cell.
    pub fn set_value(&mut self, i: usize, x: f64) {
        self.values[i] = x;
    }


    pub(crate) fn delete_value_at(&mut self, position: usize) {
        self.values.remove(position);
    }
}
