//! Cross-run compiler: joins the per-run artifacts in a data directory into
//! one table row per experiment.

pub mod compiler;
pub mod naming;
pub mod table;

pub use compiler::{compile, compile_dir, Compilation, ExcludedRun, RunRecord};
pub use naming::{split_file_name, ArtifactKind, RunIdentity};
pub use table::{render_report, write_json, write_table_csv};
