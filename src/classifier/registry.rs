use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MilkError, Result};
use crate::learner::{
    Assumption,
    Milr,
    MilrOptions,
    DiverseDensity,
    DiverseDensityOptions,
};
use super::MIClassifier;


/// A constructor stored in a [`ClassifierRegistry`].
/// Takes the options of the classifier as a JSON value.
pub type Constructor = Box<
    dyn Fn(&Value) -> Result<Box<dyn MIClassifier>> + Send + Sync
>;


/// A map from classifier names to constructors.
///
/// # Example
/// ```
/// use milk::{ClassifierRegistry, MIClassifier};
/// use serde_json::json;
///
/// let registry = ClassifierRegistry::with_defaults();
/// let milr = registry.create("MILR", &json!({ "ridge": 1e-4 })).unwrap();
/// assert_eq!(milr.name(), "MILR");
/// assert!(registry.create("SVM", &json!(null)).is_err());
/// ```
pub struct ClassifierRegistry {
    constructors: BTreeMap<String, Constructor>,
}


impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}


impl ClassifierRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self { constructors: BTreeMap::new(), }
    }


    /// Construct a registry that knows `MILR`, `MILRGEOM`, `DD` and `MDD`.
    ///
    /// `MILRGEOM` and `MDD` take the options of `MILR` and `DD`
    /// with the assumption fixed to [`Assumption::Collective`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (name, assumption) in [
            ("MILR", Assumption::Standard),
            ("MILRGEOM", Assumption::Collective),
        ] {
            registry.register(name, move |options| {
                let mut options = parse_options::<MilrOptions>(options)?;
                options.assumption = assumption;
                let milr: Box<dyn MIClassifier> = Box::new(Milr::from_options(options));
                Ok(milr)
            });
        }
        for (name, assumption) in [
            ("DD", Assumption::Standard),
            ("MDD", Assumption::Collective),
        ] {
            registry.register(name, move |options| {
                let mut options = parse_options::<DiverseDensityOptions>(options)?;
                options.assumption = assumption;
                let dd: Box<dyn MIClassifier> = Box::new(DiverseDensity::from_options(options));
                Ok(dd)
            });
        }
        registry
    }


    /// Registers `constructor` under `name`.
    /// An existing entry with the same name is replaced.
    pub fn register<T, F>(&mut self, name: T, constructor: F)
        where T: ToString,
              F: Fn(&Value) -> Result<Box<dyn MIClassifier>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.to_string(), Box::new(constructor));
    }


    /// Returns a new, unbuilt classifier registered under `name`.
    pub fn create(&self, name: &str, options: &Value)
        -> Result<Box<dyn MIClassifier>>
    {
        let constructor = self.constructors.get(name)
            .ok_or_else(|| MilkError::UnknownClassifier(name.to_string()))?;
        constructor(options)
    }


    /// Returns `true` if a classifier is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }


    /// Returns the registered names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.constructors.keys().map(|name| name.as_str())
    }
}


impl fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierRegistry")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}


/// Parses typed options. `null` yields the defaults.
pub(crate) fn parse_options<T>(options: &Value) -> Result<T>
    where T: DeserializeOwned + Default,
{
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|e| MilkError::Options(e.to_string()))
}
