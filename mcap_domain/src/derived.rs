use std::sync::Arc;

use derivative::Derivative;

use crate::dataset::{Column, DatasetError, WideDataset};

type RowFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// A named column computed per row from the values of its declared input columns.
///
/// `eval` receives the input values in the order the inputs were declared.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Formula {
    name: String,
    inputs: Vec<String>,
    #[derivative(Debug = "ignore")]
    eval: Arc<RowFn>,
}

impl Formula {
    pub fn new<S, F>(name: impl Into<String>, inputs: &[S], eval: F) -> Formula
    where
        S: AsRef<str>,
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Formula {
            name: name.into(),
            inputs: inputs.iter().map(|s| s.as_ref().to_owned()).collect(),
            eval: Arc::new(eval),
        }
    }

    pub fn sum<S: AsRef<str>>(name: impl Into<String>, inputs: &[S]) -> Formula {
        Formula::new(name, inputs, |xs| xs.iter().sum())
    }

    /// `sum(numerator) / sum(denominator) * 100`, NaN when the denominator is zero.
    pub fn percent_of<S: AsRef<str>>(name: impl Into<String>, numerator: &[S], denominator: &[S]) -> Formula {
        let split = numerator.len();
        let inputs: Vec<&str> = numerator.iter()
            .chain(denominator.iter())
            .map(|s| s.as_ref())
            .collect();

        Formula::new(name, &inputs, move |xs| {
            let (num, den) = xs.split_at(split);
            percent(num.iter().sum(), den.iter().sum())
        })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn inputs(&self) -> &[String] { &self.inputs }

    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        (self.eval)(inputs)
    }
}

/// Ratio as a percentage. A zero denominator yields NaN, meaning "undefined, do not plot".
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0f64 {
        f64::NAN
    } else {
        numerator / denominator * 100f64
    }
}

/// Applies `formulas` left to right; each new column is visible to later formulas.
///
/// Columns are recomputed in full. A formula named after an existing column replaces it.
pub fn compute_derived(dataset: &WideDataset, formulas: &[Formula]) -> Result<WideDataset, DatasetError> {
    let mut out = dataset.clone();

    for formula in formulas {
        let inputs = formula.inputs.iter()
            .map(|name| out.column(name)
                .map(|values| values.to_vec())
                .ok_or_else(|| DatasetError::UnknownColumn { name: name.clone() }))
            .collect::<Result<Vec<Vec<f64>>, _>>()?;

        let mut row = vec![0f64; inputs.len()];
        let values = (0..out.len())
            .map(|i| {
                for (slot, column) in row.iter_mut().zip(inputs.iter()) {
                    *slot = column[i];
                }
                formula.evaluate(&row)
            })
            .collect();

        out.insert_column(Column::new(formula.name.clone(), values))?;
    }

    Ok(out)
}
