//! The multiple-instance data model.
//!
//! A flat [`Dataset`] of weighted rows is grouped into bags
//! ([`Exemplar`]) by the value of a nominal id column.
//! An [`Exemplars`] holds the bags of one dataset.

// Provides the column schema.
pub(crate) mod attribute;
// Provides a weighted row.
pub(crate) mod instance;
// Provides the flat dataset and its header.
pub(crate) mod dataset;
// Provides a bag.
pub(crate) mod exemplar;
// Provides a collection of bags.
pub(crate) mod exemplars;
// Provides bag statistics.
pub(crate) mod bag_stats;

// Provides a struct that converts a data frame.
pub(crate) mod dataset_reader;

// Provides a generator of artificial bags.
pub(crate) mod synthetic;


pub use attribute::{Attribute, AttributeKind};
pub use instance::Instance;
pub use dataset::{Dataset, Header};
pub use exemplar::Exemplar;
pub use exemplars::Exemplars;
pub use bag_stats::BagStats;
pub use dataset_reader::DatasetReader;
pub use synthetic::{PopulationGenerator, Population, bag_posterior};
