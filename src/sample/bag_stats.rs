use serde::{Serialize, Deserialize};
use std::fmt;

use crate::common::utils;
use super::exemplars::Exemplars;


/// Descriptive statistics of a bag collection.
///
/// A bag counts as positive if its class value is `1`
/// and as negative if it is `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagStats {
    /// Number of bags.
    pub n_bags: usize,
    /// Total number of rows over all bags.
    pub n_instances: usize,
    /// Number of feature attributes (id and class excluded).
    pub n_features: usize,
    /// Mean number of rows per bag.
    pub mean_bag_size: f64,
    /// Largest bag size.
    pub max_bag_size: usize,
    /// Smallest bag size.
    pub min_bag_size: usize,
    /// Median bag size.
    pub median_bag_size: f64,
    /// Number of bags labeled `1`.
    pub n_positive: usize,
    /// Number of bags labeled `0`.
    pub n_negative: usize,
}


impl BagStats {
    /// Compute the statistics of `bags`.
    pub fn from_exemplars(bags: &Exemplars) -> Self {
        let sizes = bags.nums_instances();
        let n_bags = sizes.len();
        let n_instances = sizes.iter().sum::<usize>();

        let mean_bag_size = if n_bags == 0 {
            0.0
        } else {
            n_instances as f64 / n_bags as f64
        };
        let as_f64 = sizes.iter()
            .map(|&s| s as f64)
            .collect::<Vec<_>>();
        let median_bag_size = if n_bags == 0 {
            0.0
        } else {
            utils::median(&as_f64)
        };

        let n_positive = bags.iter()
            .filter(|bag| bag.class_label() == Some(1))
            .count();
        let n_negative = bags.iter()
            .filter(|bag| bag.class_label() == Some(0))
            .count();

        Self {
            n_bags,
            n_instances,
            n_features: bags.num_attributes().saturating_sub(2),
            mean_bag_size,
            max_bag_size: sizes.iter().copied().max().unwrap_or(0),
            min_bag_size: sizes.iter().copied().min().unwrap_or(0),
            median_bag_size,
            n_positive,
            n_negative,
        }
    }
}


impl fmt::Display for BagStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# of bags:          {}", self.n_bags)?;
        writeln!(f, "# of instances:     {}", self.n_instances)?;
        writeln!(f, "# of attributes:    {}", self.n_features)?;
        writeln!(f, "# of positive bags: {}", self.n_positive)?;
        writeln!(f, "# of negative bags: {}", self.n_negative)?;
        writeln!(f, "average bag size:   {:.4}", self.mean_bag_size)?;
        writeln!(f, "median bag size:    {:.1}", self.median_bag_size)?;
        writeln!(f, "max bag size:       {}", self.max_bag_size)?;
        write!(f, "min bag size:       {}", self.min_bag_size)
    }
}
