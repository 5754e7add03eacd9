mod export;

pub use export::{export_with, run_export, ExportOptions, RowSource};
