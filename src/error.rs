//! Error enumerations.

use thiserror::Error;


/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, MilkError>;


/// Errors raised by the bag model, the evaluation harness,
/// and the classifiers.
#[derive(Debug, Error)]
pub enum MilkError {
    /// A row does not fit the bag (or dataset) it is added to.
    ///
    /// This occurs if the row has a different identifier value,
    /// a different number of values, or a nominal code
    /// that the attribute does not define.
    #[error("incompatible row: {0}")]
    IncompatibleRow(String),

    /// A bag with the same identifier already exists in the collection.
    #[error("a bag with id `{0}` already exists")]
    DuplicateId(String),

    /// The identifier attribute is not nominal.
    #[error("the id attribute `{0}` is not nominal")]
    IdNotNominal(String),

    /// The class index of the dataset is not set.
    #[error("the class index is not set")]
    ClassUnset,

    /// An attribute index is out of range.
    #[error("attribute index {index} is out of range (# of attributes = {len})")]
    AttributeOutOfRange {
        #[doc(hidden)]
        index: usize,
        #[doc(hidden)]
        len: usize,
    },

    /// The id or class column cannot be removed.
    #[error("cannot delete the {0} attribute")]
    ProtectedAttribute(&'static str),

    /// The fold configuration is invalid.
    #[error("invalid fold: {0}")]
    InvalidFold(String),

    /// The class attribute is not nominal.
    #[error(
        "class `{0}` is not nominal. \
        Data not suitable for multiple-instance learning"
    )]
    NonNominalClass(String),

    /// The cost matrix does not fit the number of classes.
    #[error("cost matrix error: {0}")]
    CostMatrix(String),

    /// The classifier returned a malformed distribution.
    #[error("distribution error: {0}")]
    Distribution(String),

    /// Text attributes cannot be handled by the classifier.
    #[error("cannot handle text attribute `{0}`")]
    TextAttributes(String),

    /// A classifier could not be trained on the given bags.
    #[error("build error: {0}")]
    Build(String),

    /// A classifier is used before `build_classifier` succeeded.
    #[error("{0}: no model built yet")]
    NotBuilt(String),

    /// No classifier is registered under the given name.
    #[error("unknown classifier `{0}`")]
    UnknownClassifier(String),

    /// The options for a classifier are malformed.
    #[error("options error: {0}")]
    Options(String),

    /// Weights for resampling are invalid.
    #[error("weights error: {0}")]
    Weights(String),

    /// A `polars` operation failed while converting a data frame.
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}
