use log::{info, warn};
use snafu::ResultExt;

use mcap_domain::models::CategoryTable;

use crate::store::{Workbook, StoreError, Csv};
use crate::store::{lock_sheet, open_sheet, recover, replace_sheet};

pub const COIN_COLUMN: &str = "Coin";
pub const CATEGORY_COLUMN: &str = "Category";

pub fn write(workbook: &Workbook, sheet: &str, table: &CategoryTable) -> Result<(), StoreError> {
    let path = workbook.sheet_path(sheet);
    let lock = lock_sheet(&path);
    let _guard = recover(lock.lock());

    replace_sheet(&path, |w| {
        w.write_record(&[COIN_COLUMN, CATEGORY_COLUMN])?;
        for (coin, category) in table.iter() {
            w.write_record(&[coin, category])?;
        }
        Ok(())
    })?;

    info!("Saved {} coin categories to '{}'", table.len(), path.display());
    Ok(())
}

/// A missing sheet, or one without `Coin` and `Category` columns, reads as an empty table.
pub fn read(workbook: &Workbook, sheet: &str) -> Result<CategoryTable, StoreError> {
    let path = workbook.sheet_path(sheet);
    let mut reader = match open_sheet(&path)? {
        Some(reader) => reader,
        None => return Ok(CategoryTable::new()),
    };

    let headers = reader.headers().context(Csv { path: &path })?.clone();
    let coin_pos = headers.iter().position(|h| h == COIN_COLUMN);
    let category_pos = headers.iter().position(|h| h == CATEGORY_COLUMN);

    let (coin_pos, category_pos) = match (coin_pos, category_pos) {
        (Some(c), Some(k)) => (c, k),
        _ => {
            warn!("Sheet '{}' lacks '{}' or '{}' columns, ignoring it", path.display(), COIN_COLUMN, CATEGORY_COLUMN);
            return Ok(CategoryTable::new());
        },
    };

    let mut table = CategoryTable::new();
    for record in reader.records() {
        let record = record.context(Csv { path: &path })?;
        let coin = record.get(coin_pos).unwrap_or("");
        let category = record.get(category_pos).unwrap_or("");
        table.insert(coin, category);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn round_trips_table() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::new(dir.path());
        let table = CategoryTable::from_pairs(vec![
            ("Bitcoin", "Store of Value"),
            ("Tether", "Stablecoin"),
            ("Solana, the chain", "Layer 1"),
        ]);

        write(&workbook, "Coin Categories", &table).unwrap();
        assert_eq!(read(&workbook, "Coin Categories").unwrap(), table);
    }

    #[test]
    fn missing_or_foreign_sheet_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::new(dir.path());
        assert!(read(&workbook, "Coin Categories").unwrap().is_empty());

        fs::write(workbook.sheet_path("Coin Categories"), "Name,Group\nBitcoin,Top\n").unwrap();
        assert!(read(&workbook, "Coin Categories").unwrap().is_empty());
    }

    #[test]
    fn blank_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::new(dir.path());
        fs::write(workbook.sheet_path("Coin Categories"), "Category,Coin\nLayer 1,Solana\n,Zcash\nMeme,\n").unwrap();

        let table = read(&workbook, "Coin Categories").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.category_of("Solana"), "Layer 1");
        assert_eq!(table.category_of("Zcash"), table.fallback());
    }
}
