use serde::{Serialize, Deserialize};
use std::fmt;

use crate::common::utils;
use crate::error::{MilkError, Result};


/// A square matrix of misclassification costs.
/// The entry `(i, j)` is the cost of predicting class `j`
/// for a bag of class `i`.
///
/// # Example
/// ```
/// use milk::CostMatrix;
///
/// let cost = CostMatrix::from_json_str("[[0.0, 1.0], [5.0, 0.0]]").unwrap();
/// assert_eq!(cost.size(), 2);
/// assert_eq!(cost.get_element(1, 0), 5.0);
/// assert_eq!(cost.max_cost(0), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct CostMatrix {
    rows: Vec<Vec<f64>>,
}


impl CostMatrix {
    /// The `n × n` matrix with zeros on the diagonal and ones elsewhere.
    pub fn uniform(n: usize) -> Self {
        let rows = (0..n)
            .map(|i| {
                (0..n).map(|j| if i == j { 0.0 } else { 1.0 }).collect()
            })
            .collect();
        Self { rows }
    }


    /// Construct a cost matrix from its rows.
    /// Fails if the rows do not form a square matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(MilkError::CostMatrix(format!(
                "row {i} has {} entries, expected {n}", row.len()
            )));
        }
        Ok(Self { rows })
    }


    /// Parse a cost matrix written as a JSON array of rows.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| MilkError::CostMatrix(e.to_string()))
    }


    /// Number of classes the matrix covers.
    pub fn size(&self) -> usize {
        self.rows.len()
    }


    /// Cost of predicting `predicted` for a bag of class `actual`.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    #[inline]
    pub fn get_element(&self, actual: usize, predicted: usize) -> f64 {
        self.rows[actual][predicted]
    }


    /// Set the cost of predicting `predicted` for a bag of class `actual`.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    #[inline]
    pub fn set_element(&mut self, actual: usize, predicted: usize, cost: f64) {
        self.rows[actual][predicted] = cost;
    }


    /// The largest cost in row `actual`.
    /// This is the cost charged to a bag left unclassified.
    pub fn max_cost(&self, actual: usize) -> f64 {
        self.rows[actual].iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }


    /// Returns the rows of the matrix.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}


impl TryFrom<Vec<Vec<f64>>> for CostMatrix {
    type Error = MilkError;
    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}


impl From<CostMatrix> for Vec<Vec<f64>> {
    fn from(cost: CostMatrix) -> Self {
        cost.rows
    }
}


impl fmt::Display for CostMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for &c in row {
                write!(f, " {}", utils::double_to_string(c, 8, 3))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
