use thiserror::Error;

use crate::model::{DuplicateKey, SourceSystem};

#[derive(Debug, Error)]
pub enum MergeError {
    /// Key fields or column names do not fit the two tables.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A source table has no data rows.
    #[error("{0} table is empty (no data rows)")]
    EmptyInput(SourceSystem),
    /// Duplicate keys within one source while duplicates are disallowed.
    #[error("{}", format_duplicates(.0))]
    AmbiguousKey(Vec<DuplicateKey>),
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty key list, bad header row, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("at least one key field must be specified")]
    NoKeyFields,
    #[error("key field '{field}' not found in {}", join_systems(.missing_in))]
    MissingKeyField {
        field: String,
        missing_in: Vec<SourceSystem>,
        available: Vec<String>,
    },
    #[error("{system}: column '{column}' uses a reserved output name")]
    ReservedColumn { system: SourceSystem, column: String },
    #[error("{system}: cannot rename '{from}' to '{to}': {reason}")]
    Rename {
        system: SourceSystem,
        from: String,
        to: String,
        reason: String,
    },
    #[error("mapping column '{column}' not found in either table")]
    UnknownMappingColumn { column: String, available: Vec<String> },
    #[error("mapping column '{column}' becomes '{mapped}', which clashes with an output column")]
    MappingNameClash { column: String, mapped: String },
}

impl SchemaError {
    /// Column names worth suggesting to the user, if any.
    pub fn available_columns(&self) -> Option<&[String]> {
        match self {
            Self::MissingKeyField { available, .. } | Self::UnknownMappingColumn { available, .. } => {
                Some(available)
            }
            _ => None,
        }
    }
}

fn join_systems(systems: &[SourceSystem]) -> String {
    systems
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(" and ")
}

fn format_duplicates(dups: &[DuplicateKey]) -> String {
    let mut out = String::from("duplicate keys found:");
    for dup in dups {
        out.push_str(&format!(
            "\n  {} key {:?} appears {} times",
            dup.system, dup.mdg_key, dup.count
        ));
    }
    out
}
