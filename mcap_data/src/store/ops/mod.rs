pub mod wide_sheet;
pub mod category_sheet;
pub mod long_sheet;
