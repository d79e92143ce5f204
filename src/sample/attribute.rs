use serde::{Serialize, Deserialize};
use std::fmt;


/// The type of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Real-valued column.
    Numeric,
    /// Categorical column. A cell stores the index of its value.
    Nominal(Vec<String>),
    /// Free-text column. A cell stores the index into the value table.
    /// Classifiers in this crate reject text columns.
    Text(Vec<String>),
}


/// A named, typed column of a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}


impl Attribute {
    /// Construct a numeric attribute.
    pub fn numeric<T: ToString>(name: T) -> Self {
        Self { name: name.to_string(), kind: AttributeKind::Numeric, }
    }


    /// Construct a nominal attribute with the given values.
    pub fn nominal<T, S>(name: T, values: &[S]) -> Self
        where T: ToString,
              S: ToString,
    {
        let values = values.iter()
            .map(|v| v.to_string())
            .collect();
        Self { name: name.to_string(), kind: AttributeKind::Nominal(values), }
    }


    /// Construct a text attribute with the given value table.
    pub fn text<T, S>(name: T, values: &[S]) -> Self
        where T: ToString,
              S: ToString,
    {
        let values = values.iter()
            .map(|v| v.to_string())
            .collect();
        Self { name: name.to_string(), kind: AttributeKind::Text(values), }
    }


    /// Returns the attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }


    pub(crate) fn set_name<T: ToString>(&mut self, name: T) {
        self.name = name.to_string();
    }


    /// Returns the attribute kind.
    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }


    /// Returns `true` if this attribute is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }


    /// Returns `true` if this attribute is nominal.
    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }


    /// Returns `true` if this attribute is a text attribute.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, AttributeKind::Text(_))
    }


    /// Returns the number of values of a nominal/text attribute.
    /// Numeric attributes have `0` values.
    pub fn num_values(&self) -> usize {
        match &self.kind {
            AttributeKind::Numeric => 0,
            AttributeKind::Nominal(values)
                | AttributeKind::Text(values) => values.len(),
        }
    }


    /// Returns the label of the `index`-th value.
    pub fn value(&self, index: usize) -> Option<&str> {
        match &self.kind {
            AttributeKind::Numeric => None,
            AttributeKind::Nominal(values)
                | AttributeKind::Text(values) => {
                values.get(index).map(|v| v.as_str())
            },
        }
    }


    /// Returns the index of the given label.
    pub fn index_of_value(&self, label: &str) -> Option<usize> {
        match &self.kind {
            AttributeKind::Numeric => None,
            AttributeKind::Nominal(values)
                | AttributeKind::Text(values) => {
                values.iter().position(|v| v == label)
            },
        }
    }


    /// Returns `true` if `x` is a legal cell value for this attribute.
    /// Missing values (`NaN`) are always legal.
    pub fn accepts(&self, x: f64) -> bool {
        if x.is_nan() { return true; }
        match &self.kind {
            AttributeKind::Numeric => x.is_finite(),
            AttributeKind::Nominal(values)
                | AttributeKind::Text(values) => {
                x >= 0.0 && x.fract() == 0.0 && (x as usize) < values.len()
            },
        }
    }


    /// Returns the label of a cell, `?` for a missing value.
    pub fn format_value(&self, x: f64) -> String {
        if x.is_nan() { return "?".to_string(); }
        match self.value(x as usize) {
            Some(label) => label.to_string(),
            None => x.to_string(),
        }
    }
}


impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AttributeKind::Numeric => {
                write!(f, "@attribute {} numeric", self.name)
            },
            AttributeKind::Nominal(values) => {
                write!(f, "@attribute {} {{{}}}", self.name, values.join(","))
            },
            AttributeKind::Text(_) => {
                write!(f, "@attribute {} string", self.name)
            },
        }
    }
}
