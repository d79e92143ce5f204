use polars::prelude::*;
use rayon::prelude::*;

use crate::error::{MilkError, Result};
use super::attribute::Attribute;
use super::dataset::Dataset;
use super::instance::Instance;


/// A struct that converts a `polars::DataFrame` into [`Dataset`].
///
/// Numeric columns become numeric attributes.
/// Every other column (strings, categoricals, booleans) becomes
/// a nominal attribute whose values appear in first-seen order.
/// The class column and the columns named by
/// [`DatasetReader::nominal_column`] are always nominal;
/// if they are numeric, their distinct values are sorted.
/// Nulls become missing values.
///
/// # Example
/// ```no_run
/// use milk::prelude::*;
/// use polars::prelude::*;
///
/// # fn main() -> milk::Result<()> {
/// let df = df!(
///     "bag" => ["b1", "b1", "b2"],
///     "x" => [0.5, 1.5, -2.0],
///     "class" => ["pos", "pos", "neg"],
/// )?;
/// let dataset = DatasetReader::new(&df)
///     .relation("musk")
///     .nominal_column("bag")
///     .class_column("class")
///     .read()?;
/// let bags = Exemplars::from_dataset(&dataset, 0)?;
/// assert_eq!(bags.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct DatasetReader<'a> {
    frame: &'a DataFrame,
    relation: String,
    class: Option<String>,
    weight: Option<String>,
    nominal: Vec<String>,
}


impl<'a> DatasetReader<'a> {
    /// Construct a new instance of [`DatasetReader`].
    pub fn new(frame: &'a DataFrame) -> Self {
        Self {
            frame,
            relation: String::from("dataframe"),
            class: None,
            weight: None,
            nominal: Vec::new(),
        }
    }


    /// Set the relation name. Default is `"dataframe"`.
    #[inline]
    pub fn relation<T: ToString>(mut self, name: T) -> Self {
        self.relation = name.to_string();
        self
    }


    /// Set the column that is used as the class label.
    #[inline]
    pub fn class_column<T: ToString>(mut self, name: T) -> Self {
        self.class = Some(name.to_string());
        self
    }


    /// Set the column that holds the row weights.
    /// The column is not converted into an attribute.
    #[inline]
    pub fn weight_column<T: ToString>(mut self, name: T) -> Self {
        self.weight = Some(name.to_string());
        self
    }


    /// Force the given column to be nominal.
    /// Use this for numeric bag identifiers.
    #[inline]
    pub fn nominal_column<T: ToString>(mut self, name: T) -> Self {
        self.nominal.push(name.to_string());
        self
    }


    /// Reads the data frame and returns a [`Dataset`].
    pub fn read(self) -> Result<Dataset> {
        let n_rows = self.frame.height();

        if let Some(class) = &self.class {
            self.frame.column(class)?;
        }
        for name in self.nominal.iter() {
            self.frame.column(name)?;
        }

        let weights = match &self.weight {
            Some(name) => weight_column(self.frame.column(name)?)?,
            None => vec![1.0; n_rows],
        };

        let columns = self.frame.get_columns()
            .iter()
            .filter(|series| Some(series.name()) != self.weight.as_deref())
            .collect::<Vec<_>>();

        let converted = columns.into_par_iter()
            .map(|series| {
                let name = series.name();
                let forced = self.nominal.iter().any(|n| n == name)
                    || self.class.as_deref() == Some(name);
                convert_series(series, forced)
            })
            .collect::<Result<Vec<_>>>()?;

        let (attributes, cells): (Vec<_>, Vec<_>) = converted.into_iter()
            .unzip();

        let class_index = match &self.class {
            Some(class) => attributes.iter()
                .position(|att| att.name() == class),
            None => None,
        };

        let mut dataset = Dataset::new(self.relation, attributes);
        if let Some(index) = class_index {
            dataset.set_class_index(index)?;
        }

        for (r, &w) in weights.iter().enumerate() {
            let values = cells.iter()
                .map(|column| column[r])
                .collect::<Vec<_>>();
            dataset.push(Instance::new(values).with_weight(w))?;
        }
        Ok(dataset)
    }
}


impl Dataset {
    /// Convert a `polars::DataFrame` into a [`Dataset`]
    /// with `class_column` as the class attribute.
    /// See [`DatasetReader`] for the conversion rules.
    pub fn from_dataframe(frame: &DataFrame, class_column: &str)
        -> Result<Self>
    {
        DatasetReader::new(frame)
            .class_column(class_column)
            .read()
    }
}


fn weight_column(series: &Series) -> Result<Vec<f64>> {
    let cast = series.cast(&DataType::Float64)?;
    cast.f64()?
        .into_iter()
        .map(|w| {
            w.filter(|w| w.is_finite() && *w >= 0.0)
                .ok_or_else(|| MilkError::Weights(format!(
                    "column `{}` has a missing or negative weight",
                    series.name(),
                )))
        })
        .collect()
}


/// Converts a column into an attribute and its cells.
fn convert_series(series: &Series, forced_nominal: bool)
    -> Result<(Attribute, Vec<f64>)>
{
    let name = series.name();
    let numeric = series.dtype().is_numeric();

    if numeric && !forced_nominal {
        let cast = series.cast(&DataType::Float64)?;
        let cells: Vec<f64> = cast.f64()?
            .into_iter()
            .map(|x| x.unwrap_or(f64::NAN))
            .collect();
        return Ok((Attribute::numeric(name), cells));
    }

    if numeric {
        let cast = series.cast(&DataType::Float64)?;
        let raw = cast.f64()?
            .into_iter()
            .collect::<Vec<_>>();

        let mut distinct = raw.iter()
            .flatten()
            .copied()
            .filter(|x| !x.is_nan())
            .collect::<Vec<_>>();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();

        let labels = distinct.iter()
            .map(|&x| numeric_label(x))
            .collect::<Vec<_>>();
        let cells: Vec<f64> = raw.into_iter()
            .map(|x| {
                x.and_then(|x| {
                    distinct.iter().position(|&d| d == x)
                })
                .map(|k| k as f64)
                .unwrap_or(f64::NAN)
            })
            .collect();
        return Ok((Attribute::nominal(name, &labels), cells));
    }

    let cast = series.cast(&DataType::Utf8)?;
    let mut labels: Vec<String> = Vec::new();
    let cells: Vec<f64> = cast.utf8()?
        .into_iter()
        .map(|label| {
            let Some(label) = label else { return f64::NAN; };
            let k = match labels.iter().position(|l| l == label) {
                Some(k) => k,
                None => {
                    labels.push(label.to_string());
                    labels.len() - 1
                },
            };
            k as f64
        })
        .collect();
    Ok((Attribute::nominal(name, &labels), cells))
}


fn numeric_label(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        x.to_string()
    }
}
