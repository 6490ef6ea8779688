use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{info, warn};
use snafu::{ResultExt, OptionExt};

use mcap_domain::{Column, WideDataset, TIMESTAMP_COLUMN};

use crate::store::{Workbook, StoreError, Csv, InvalidTimestamp, InvalidValue, InvalidDataset};
use crate::store::{lock_sheet, open_sheet, recover, replace_sheet};
use crate::store::convert::{format_timestamp, format_value, parse_timestamp, parse_value};

/// Replaces `sheet` with `dataset`: a `Timestamp` column followed by the dataset's columns.
pub fn write(workbook: &Workbook, sheet: &str, dataset: &WideDataset) -> Result<(), StoreError> {
    let path = workbook.sheet_path(sheet);
    let lock = lock_sheet(&path);
    let _guard = recover(lock.lock());

    replace_sheet(&path, |w| {
        let mut header = vec![TIMESTAMP_COLUMN];
        header.extend(dataset.column_names());
        w.write_record(&header)?;

        for (ts, values) in dataset.rows() {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(format_timestamp(&ts));
            record.extend(values.into_iter().map(format_value));
            w.write_record(&record)?;
        }
        Ok(())
    })?;

    info!("Saved {} rows x {} columns to '{}'", dataset.len(), dataset.columns().len(), path.display());
    Ok(())
}

/// Reads `sheet` back as a wide dataset.
///
/// A missing sheet, or one lacking any of `expected`, reads as an empty dataset with the
/// `expected` columns. Rows are sorted by timestamp; a repeated timestamp keeps its last row.
pub fn read<S: AsRef<str>>(workbook: &Workbook, sheet: &str, expected: &[S]) -> Result<WideDataset, StoreError> {
    let path = workbook.sheet_path(sheet);
    let mut reader = match open_sheet(&path)? {
        Some(reader) => reader,
        None => return Ok(WideDataset::with_columns(expected)),
    };

    let headers = reader.headers().context(Csv { path: &path })?.clone();
    let ts_pos = headers.iter().position(|h| h == TIMESTAMP_COLUMN);
    let missing: Vec<&str> = expected.iter()
        .map(|s| s.as_ref())
        .filter(|name| !headers.iter().any(|h| h == *name))
        .collect();

    let ts_pos = match ts_pos {
        Some(pos) if missing.is_empty() => pos,
        _ => {
            warn!("Sheet '{}' lacks columns {:?}, starting from an empty dataset", path.display(), missing);
            return Ok(WideDataset::with_columns(expected));
        },
    };

    let names: Vec<(usize, String)> = headers.iter()
        .enumerate()
        .filter(|(i, _)| *i != ts_pos)
        .map(|(i, h)| (i, h.to_owned()))
        .collect();

    let mut rows: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for record in reader.records() {
        let record = record.context(Csv { path: &path })?;
        let line = record.position().map_or(0, |p| p.line());

        let raw_ts = record.get(ts_pos).unwrap_or("");
        let ts = parse_timestamp(raw_ts)
            .context(InvalidTimestamp { path: &path, line, value: raw_ts })?;

        let mut values = Vec::with_capacity(names.len());
        for (i, name) in &names {
            let raw = record.get(*i).unwrap_or("");
            let value = parse_value(raw)
                .context(InvalidValue { path: &path, line, column: name.as_str(), value: raw })?;
            values.push(value);
        }

        rows.insert(ts, values);
    }

    let index: Vec<DateTime<Utc>> = rows.keys().copied().collect();
    let columns = names.into_iter()
        .enumerate()
        .map(|(c, (_, name))| Column::new(name, rows.values().map(|r| r[c]).collect()))
        .collect();

    WideDataset::from_parts(index, columns)
        .context(InvalidDataset { path })
}
