#[macro_use]
extern crate lazy_static;

pub mod models;
pub mod dataset;
pub mod merge;
pub mod derived;
pub mod metrics;
pub mod long;
pub mod chart;

pub use dataset::{WideDataset, Column, DatasetError, TIMESTAMP_COLUMN};
pub use merge::{merge, merge_group, SeriesMerger};
pub use derived::{Formula, compute_derived};
