//! Call-profile report parsing and prediction-log accuracy.

pub mod predictions;
pub mod report;

pub use predictions::{load_accuracy, Accuracy, PredictionLog, PredictionRow};
pub use report::{load_report, lookup, parse, parse_rows, ProfileReport, ProfileRow};
