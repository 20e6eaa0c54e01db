// Table I/O: load sources, export merge outputs

pub mod csv;
pub mod error;
pub mod export;
pub mod fetch;
pub mod loader;
pub mod xlsx;

pub use error::IoError;
pub use export::{export_table, write_outputs, xlsx_bytes};
pub use loader::{describe, load, LoadOptions, SourceFormat};
