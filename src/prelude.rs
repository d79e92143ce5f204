//! Exports the bag model, the classifiers, and the evaluation harness.
//!
pub use crate::sample::{
    // Data model -------------------------------
    Attribute,
    AttributeKind,
    Instance,
    Dataset,
    Header,
    Exemplar,
    Exemplars,
    BagStats,


    // Data sources -----------------------------
    DatasetReader,
    PopulationGenerator,
    Population,
};


pub use crate::classifier::{
    // Classifier trait
    MIClassifier,
    ClassifierRegistry,
};


pub use crate::learner::{
    Milr,
    MilrOptions,
    DiverseDensity,
    DiverseDensityOptions,
    Assumption,
};


pub use crate::optimization::{
    ObjectiveFunction,
    FnObjective,
    Bfgs,
    LineSearch,
    Minimum,
};


pub use crate::research::{
    CostMatrix,
    CrossValidation,
    MIEvaluation,
};


pub use crate::error::MilkError;
