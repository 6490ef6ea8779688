use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Timelike, Utc};
use snafu::{Snafu, ensure};

pub const TIMESTAMP_COLUMN: &str = "Timestamp";

#[derive(Debug, Snafu, PartialEq)]
pub enum DatasetError {
    #[snafu(display("Unknown column '{}'", name))]
    UnknownColumn { name: String },

    #[snafu(display("Column '{}' appears more than once", name))]
    DuplicateColumn { name: String },

    #[snafu(display("Column '{}' has {} values, but the index has {} rows", name, actual, expected))]
    LengthMismatch { name: String, expected: usize, actual: usize },

    #[snafu(display("Timestamps must be unique and ascending (row {})", row))]
    UnsortedIndex { row: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Column {
        Column { name: name.into(), values }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn values(&self) -> &[f64] { &self.values }
}

/// Table keyed by timestamp with one value column per entity or derived metric.
///
/// Every column has exactly one value per index row. Columns are kept in a meaningful order:
/// merges produce name order, derived columns are appended, and `select` sets an explicit order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WideDataset {
    index: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl WideDataset {
    pub fn new() -> WideDataset {
        WideDataset::default()
    }

    /// No rows, but the given column headers.
    pub fn with_columns<S: AsRef<str>>(names: &[S]) -> WideDataset {
        WideDataset {
            index: Vec::new(),
            columns: names.iter()
                .filter(|n| n.as_ref() != TIMESTAMP_COLUMN)
                .map(|n| Column::new(n.as_ref(), Vec::new()))
                .collect(),
        }
    }

    pub fn from_parts(index: Vec<DateTime<Utc>>, columns: Vec<Column>) -> Result<WideDataset, DatasetError> {
        if let Some(row) = index.windows(2).position(|w| w[0] >= w[1]) {
            return UnsortedIndex { row: row + 1 }.fail();
        }

        let mut seen = BTreeSet::new();
        for c in columns.iter() {
            ensure!(seen.insert(c.name.as_str()), DuplicateColumn { name: c.name.clone() });
            ensure!(c.values.len() == index.len(), LengthMismatch {
                name: c.name.clone(),
                expected: index.len(),
                actual: c.values.len(),
            });
        }

        Ok(WideDataset { index, columns })
    }

    pub fn index(&self) -> &[DateTime<Utc>] { &self.index }
    pub fn columns(&self) -> &[Column] { &self.columns }
    pub fn len(&self) -> usize { self.index.len() }
    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position_of(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position_of(name).map(|i| self.columns[i].values.as_slice())
    }

    pub fn value(&self, timestamp: &DateTime<Utc>, column: &str) -> Option<f64> {
        let row = self.index.binary_search(timestamp).ok()?;
        self.column(column).map(|values| values[row])
    }

    /// Last row's value per column.
    pub fn latest(&self) -> Vec<(&str, f64)> {
        match self.index.len() {
            0 => Vec::new(),
            n => self.columns.iter().map(|c| (c.name.as_str(), c.values[n - 1])).collect(),
        }
    }

    /// Replaces an existing column of the same name in place, otherwise appends.
    pub fn insert_column(&mut self, column: Column) -> Result<(), DatasetError> {
        ensure!(column.values.len() == self.index.len(), LengthMismatch {
            name: column.name.clone(),
            expected: self.index.len(),
            actual: column.values.len(),
        });

        match self.position_of(&column.name) {
            Some(i) => self.columns[i] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Adds `name` as the row-wise sum of exactly the `members` columns.
    pub fn with_row_sum<S: AsRef<str>>(mut self, name: &str, members: &[S]) -> Result<WideDataset, DatasetError> {
        let mut sums = vec![0f64; self.index.len()];
        for member in members {
            let values = self.column(member.as_ref())
                .ok_or_else(|| DatasetError::UnknownColumn { name: member.as_ref().to_owned() })?;
            for (sum, v) in sums.iter_mut().zip(values) {
                *sum += *v;
            }
        }

        self.insert_column(Column::new(name, sums))?;
        Ok(self)
    }

    /// Keeps only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<WideDataset, DatasetError> {
        let columns = names.iter()
            .map(|n| {
                let n = n.as_ref();
                self.position_of(n)
                    .map(|i| self.columns[i].clone())
                    .ok_or_else(|| DatasetError::UnknownColumn { name: n.to_owned() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        WideDataset::from_parts(self.index.clone(), columns)
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> WideDataset
    where
        F: FnMut(&DateTime<Utc>) -> bool,
    {
        let rows: Vec<usize> = (0..self.index.len())
            .filter(|&i| keep(&self.index[i]))
            .collect();

        WideDataset {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self.columns.iter()
                .map(|c| Column::new(c.name.clone(), rows.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    /// Drops intraday samples, keeping rows stamped exactly at 00:00:00 UTC.
    pub fn retain_midnight(&self) -> WideDataset {
        self.filter_rows(is_utc_midnight)
    }

    /// Full outer join on the timestamp index, zero-filling cells the other side lacks.
    ///
    /// Output columns are in name order. A column present on both sides takes `other`'s value
    /// on rows `other` has, and keeps `self`'s value elsewhere.
    pub fn outer_join(&self, other: &WideDataset) -> WideDataset {
        let index: Vec<DateTime<Utc>> = self.index.iter()
            .chain(other.index.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for side in [self, other].iter() {
            let rows: Vec<usize> = side.index.iter()
                .map(|ts| index.binary_search(ts).unwrap_or_default())
                .collect();

            for c in side.columns.iter() {
                let target = cells.entry(c.name.as_str())
                    .or_insert_with(|| vec![0f64; index.len()]);
                for (&row, &v) in rows.iter().zip(c.values.iter()) {
                    target[row] = v;
                }
            }
        }

        WideDataset {
            index,
            columns: cells.into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        }
    }

    /// Iterates rows as `(timestamp, values)` with values in column order.
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, Vec<f64>)> + '_ {
        self.index.iter().enumerate()
            .map(move |(i, ts)| (*ts, self.columns.iter().map(|c| c.values[i]).collect()))
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

pub fn is_utc_midnight(ts: &DateTime<Utc>) -> bool {
    ts.num_seconds_from_midnight() == 0 && ts.nanosecond() == 0
}
