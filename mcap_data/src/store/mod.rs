//! Workbook persistence. A workbook is a directory holding one CSV file per named sheet.

pub mod convert;
pub mod ops;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LockResult, Mutex, MutexGuard};

use csv::{Reader, ReaderBuilder, Trim, Writer};
use log::{debug, warn};
use snafu::{Snafu, ResultExt};

use mcap_domain::DatasetError;

pub const MARKET_CAP_SHEET: &str = "Market Cap Data";
pub const CATEGORY_SHEET: &str = "Coin Categories";
pub const HISTORY_SHEET: &str = "Market Cap History";

const SHEET_EXTENSION: &str = "csv";

#[derive(Debug, Snafu)]
pub enum StoreError {
    #[snafu(display("I/O error on '{}': {}", path.display(), source))]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[snafu(display("Malformed CSV in '{}': {}", path.display(), source))]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    #[snafu(display("Invalid timestamp '{}' in '{}' at line {}", value, path.display(), line))]
    InvalidTimestamp {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[snafu(display("Invalid number '{}' in column '{}' of '{}' at line {}", value, column, path.display(), line))]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[snafu(display("Sheet '{}' does not form a valid dataset: {}", path.display(), source))]
    InvalidDataset {
        path: PathBuf,
        source: DatasetError,
    },
}

lazy_static! {
    static ref SHEET_LOCKS: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> = Mutex::new(HashMap::new());
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workbook {
    root: PathBuf,
}

impl Workbook {
    pub fn new(root: impl Into<PathBuf>) -> Workbook {
        Workbook { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.root.join(format!("{}.{}", sheet, SHEET_EXTENSION))
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_path(sheet).is_file()
    }

    /// Names of the sheets present on disk, sorted.
    pub fn sheet_names(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context(Io { path: self.root.clone() }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.context(Io { path: self.root.clone() })?.path();
            if path.extension().map_or(false, |ext| ext == SHEET_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_owned());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Serializes writers of the same sheet within this process.
pub(crate) fn lock_sheet(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = recover(SHEET_LOCKS.lock());
    locks.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

pub(crate) fn recover<'a, T>(result: LockResult<MutexGuard<'a, T>>) -> MutexGuard<'a, T> {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Opens a sheet for reading; `None` when the sheet does not exist.
pub(crate) fn open_sheet(path: &Path) -> Result<Option<Reader<File>>, StoreError> {
    match File::open(path) {
        Ok(file) => {
            let reader = ReaderBuilder::new()
                .flexible(true)
                .trim(Trim::All)
                .from_reader(file);
            Ok(Some(reader))
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Sheet '{}' not found", path.display());
            Ok(None)
        },
        Err(e) => Err(e).context(Io { path }),
    }
}

/// Writes a sheet to a sibling temp file, then renames it over the target.
///
/// Readers see either the old or the new sheet, never a partial one.
pub(crate) fn replace_sheet<F>(path: &Path, write: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Writer<File>) -> Result<(), csv::Error>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(Io { path: parent })?;
    }

    let tmp = path.with_extension(format!("{}.tmp", SHEET_EXTENSION));
    let file = File::create(&tmp).context(Io { path: &tmp })?;

    let mut writer = Writer::from_writer(file);
    let written = write(&mut writer)
        .context(Csv { path: &tmp })
        .and_then(|_| writer.flush().context(Io { path: &tmp }));

    drop(writer);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).context(Io { path })?;
    debug!("Wrote sheet '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_paths_live_under_root() {
        let workbook = Workbook::new("crypto_market_cap_history");
        assert_eq!(
            workbook.sheet_path(MARKET_CAP_SHEET),
            PathBuf::from("crypto_market_cap_history/Market Cap Data.csv"));
    }

    #[test]
    fn lists_only_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::new(dir.path());

        replace_sheet(&workbook.sheet_path(CATEGORY_SHEET), |w| w.write_record(&["Coin", "Category"])).unwrap();
        replace_sheet(&workbook.sheet_path(MARKET_CAP_SHEET), |w| w.write_record(&["Timestamp"])).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(workbook.sheet_names().unwrap(), vec![CATEGORY_SHEET, MARKET_CAP_SHEET]);
        assert!(workbook.has_sheet(CATEGORY_SHEET));
        assert!(!workbook.has_sheet(HISTORY_SHEET));
    }

    #[test]
    fn missing_workbook_has_no_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = Workbook::new(dir.path().join("absent"));
        assert!(workbook.sheet_names().unwrap().is_empty());
    }

    #[test]
    fn failed_write_keeps_previous_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = Workbook::new(dir.path()).sheet_path(HISTORY_SHEET);

        replace_sheet(&path, |w| w.write_record(&["a", "b"])).unwrap();
        let err = replace_sheet(&path, |w| {
            w.write_record(&["c", "d"])?;
            w.write_record(&["only-one"])
        });

        assert!(matches!(err, Err(StoreError::Csv { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n");
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
