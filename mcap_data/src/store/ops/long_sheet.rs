use log::{info, warn};
use snafu::{ResultExt, OptionExt};

use mcap_domain::long::{LongRow, COIN_COLUMN, VALUE_COLUMN};
use mcap_domain::TIMESTAMP_COLUMN;

use crate::store::{Workbook, StoreError, Csv, InvalidTimestamp, InvalidValue};
use crate::store::{lock_sheet, open_sheet, recover, replace_sheet};
use crate::store::convert::{format_timestamp, format_value, parse_timestamp, parse_value};

const HEADER: [&str; 3] = [TIMESTAMP_COLUMN, COIN_COLUMN, VALUE_COLUMN];

pub fn write(workbook: &Workbook, sheet: &str, rows: &[LongRow]) -> Result<(), StoreError> {
    let path = workbook.sheet_path(sheet);
    let lock = lock_sheet(&path);
    let _guard = recover(lock.lock());

    write_unlocked(workbook, sheet, rows)
}

/// A missing sheet reads as no rows. Rows keep their on-disk order.
pub fn read(workbook: &Workbook, sheet: &str) -> Result<Vec<LongRow>, StoreError> {
    let path = workbook.sheet_path(sheet);
    let mut reader = match open_sheet(&path)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let headers = reader.headers().context(Csv { path: &path })?.clone();
    let positions: Vec<Option<usize>> = HEADER.iter()
        .map(|name| headers.iter().position(|h| h == *name))
        .collect();

    let (ts_pos, coin_pos, value_pos) = match positions.as_slice() {
        [Some(t), Some(c), Some(v)] => (*t, *c, *v),
        _ => {
            warn!("Sheet '{}' lacks columns {:?}, ignoring it", path.display(), HEADER);
            return Ok(Vec::new());
        },
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context(Csv { path: &path })?;
        let line = record.position().map_or(0, |p| p.line());

        let raw_ts = record.get(ts_pos).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts)
            .context(InvalidTimestamp { path: &path, line, value: raw_ts })?;

        let raw_value = record.get(value_pos).unwrap_or("");
        let value = parse_value(raw_value)
            .context(InvalidValue { path: &path, line, column: VALUE_COLUMN, value: raw_value })?;

        let coin = record.get(coin_pos).unwrap_or("");
        rows.push(LongRow::new(timestamp, coin, value));
    }

    Ok(rows)
}

/// Appends `rows` after the existing ones, creating the sheet when absent.
pub fn append(workbook: &Workbook, sheet: &str, rows: &[LongRow]) -> Result<usize, StoreError> {
    let path = workbook.sheet_path(sheet);
    let lock = lock_sheet(&path);
    let _guard = recover(lock.lock());

    let mut all = read(workbook, sheet)?;
    all.extend_from_slice(rows);
    write_unlocked(workbook, sheet, &all)?;

    info!("Appended {} rows to '{}', {} in total", rows.len(), path.display(), all.len());
    Ok(all.len())
}

fn write_unlocked(workbook: &Workbook, sheet: &str, rows: &[LongRow]) -> Result<(), StoreError> {
    let path = workbook.sheet_path(sheet);

    replace_sheet(&path, |w| {
        w.write_record(&HEADER)?;
        for row in rows {
            w.write_record(&[format_timestamp(&row.timestamp), row.coin.clone(), format_value(row.value)])?;
        }
        Ok(())
    })
}
