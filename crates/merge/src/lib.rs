//! `mdmerge-engine` — two-source master-data merge engine.
//!
//! Pure engine crate: receives pre-loaded S4 and ECC tables, returns the
//! deduplicated MDtable, the full-provenance MDmapping and a summary.
//! No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod schema;
pub mod summary;

pub use config::{DuplicatePolicy, KeyTransform, MdgKeyStyle, MergeConfig, MergeOptions, OutputFormat};
pub use engine::merge;
pub use error::{MergeError, SchemaError};
pub use model::{MergeResult, MergeSummary, MergeWarning, SourceSystem, Table};
