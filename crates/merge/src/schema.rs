//! Column-name harmonization and the largest schema.
//!
//! Harmonized names are unique within a table (case-insensitively), so a
//! harmonized column list lines up position-for-position with the raw table.

use std::collections::BTreeMap;

use crate::config::MergeOptions;
use crate::error::SchemaError;
use crate::model::{SourceSystem, Table, ERP_SYSTEM_COLUMN, MDG_KEY_COLUMN};

/// Trim and collapse internal whitespace runs to a single space.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_name(name: &str) -> String {
    normalize_header(name).to_lowercase()
}

/// Convert column index to letter (0 -> A, 1 -> B, 26 -> AA, etc.)
pub fn col_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Normalize header names, name blank headers after their column letter and
/// disambiguate repeats as `Name (2)`, `Name (3)`.
pub fn harmonize_headers(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (i, header) in raw.iter().enumerate() {
        let mut name = normalize_header(header);
        if name.is_empty() {
            name = col_letter(i);
        }
        let base = name.clone();
        let mut n = 1;
        while find_column(&out, &name).is_some() {
            n += 1;
            name = format!("{base} ({n})");
        }
        out.push(name);
    }
    out
}

/// Case- and whitespace-insensitive column lookup.
pub fn find_column(columns: &[String], name: &str) -> Option<usize> {
    let wanted = fold_name(name);
    columns.iter().position(|c| fold_name(c) == wanted)
}

fn is_reserved(name: &str) -> bool {
    let folded = fold_name(name);
    folded == MDG_KEY_COLUMN.to_lowercase() || folded == ERP_SYSTEM_COLUMN.to_lowercase()
}

/// Resolved column layout for one merge.
#[derive(Debug, Clone)]
pub struct Schema {
    pub s4_columns: Vec<String>,
    pub ecc_columns: Vec<String>,
    /// Largest schema: S4 columns in S4 order, then ECC-only columns in ECC order.
    pub columns: Vec<String>,
    /// Key fields under their harmonized (S4) spelling, duplicates removed.
    pub key_fields: Vec<String>,
    pub mapping_columns: Vec<String>,
}

impl Schema {
    pub fn build(s4: &Table, ecc: &Table, options: &MergeOptions) -> Result<Self, SchemaError> {
        if options.key_fields.is_empty() {
            return Err(SchemaError::NoKeyFields);
        }

        let mut s4_columns = harmonize_headers(&s4.columns);
        let mut ecc_columns = harmonize_headers(&ecc.columns);
        apply_renames(SourceSystem::S4, &mut s4_columns, options.renames(SourceSystem::S4))?;
        apply_renames(SourceSystem::Ecc, &mut ecc_columns, options.renames(SourceSystem::Ecc))?;

        for (system, cols) in [(SourceSystem::S4, &s4_columns), (SourceSystem::Ecc, &ecc_columns)] {
            if let Some(col) = cols.iter().find(|c| is_reserved(c)) {
                return Err(SchemaError::ReservedColumn {
                    system,
                    column: col.clone(),
                });
            }
        }

        // ECC adopts the S4 spelling of shared columns.
        for col in ecc_columns.iter_mut() {
            if let Some(i) = find_column(&s4_columns, col) {
                *col = s4_columns[i].clone();
            }
        }

        let mut columns = s4_columns.clone();
        for col in &ecc_columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }

        let key_fields = resolve_key_fields(&options.key_fields, &s4_columns, &ecc_columns, &columns)?;
        let mapping_columns = resolve_mapping_columns(options, &columns)?;

        tracing::debug!(
            s4 = s4_columns.len(),
            ecc = ecc_columns.len(),
            union = columns.len(),
            keys = ?key_fields,
            "schema harmonized"
        );

        Ok(Self {
            s4_columns,
            ecc_columns,
            columns,
            key_fields,
            mapping_columns,
        })
    }

    pub fn table_columns(&self, system: SourceSystem) -> &[String] {
        match system {
            SourceSystem::S4 => &self.s4_columns,
            SourceSystem::Ecc => &self.ecc_columns,
        }
    }

    /// Position of a largest-schema column within one source table.
    pub fn source_index(&self, system: SourceSystem, column: &str) -> Option<usize> {
        self.table_columns(system).iter().position(|c| c == column)
    }

    /// Positions of the key fields within one source table.
    pub fn key_indices(&self, system: SourceSystem) -> Vec<usize> {
        self.key_fields
            .iter()
            .filter_map(|k| self.source_index(system, k))
            .collect()
    }
}

fn apply_renames(
    system: SourceSystem,
    columns: &mut [String],
    renames: &BTreeMap<String, String>,
) -> Result<(), SchemaError> {
    for (from, to) in renames {
        let err = |reason: &str| SchemaError::Rename {
            system,
            from: from.clone(),
            to: to.clone(),
            reason: reason.to_string(),
        };
        let idx = find_column(columns, from).ok_or_else(|| err("no such column"))?;
        let new_name = normalize_header(to);
        if new_name.is_empty() {
            return Err(err("new name is blank"));
        }
        if let Some(existing) = find_column(columns, &new_name) {
            if existing != idx {
                return Err(err("a column with that name already exists"));
            }
        }
        columns[idx] = new_name;
    }
    Ok(())
}

fn resolve_key_fields(
    requested: &[String],
    s4_columns: &[String],
    ecc_columns: &[String],
    union: &[String],
) -> Result<Vec<String>, SchemaError> {
    let mut resolved: Vec<String> = Vec::with_capacity(requested.len());
    for field in requested {
        let mut missing_in = Vec::new();
        if find_column(s4_columns, field).is_none() {
            missing_in.push(SourceSystem::S4);
        }
        if find_column(ecc_columns, field).is_none() {
            missing_in.push(SourceSystem::Ecc);
        }
        if !missing_in.is_empty() {
            return Err(SchemaError::MissingKeyField {
                field: field.clone(),
                missing_in,
                available: union.to_vec(),
            });
        }
        // Present in S4, so the union spelling is the S4 spelling.
        let canonical = union[find_column(union, field).unwrap_or_default()].clone();
        if !resolved.contains(&canonical) {
            resolved.push(canonical);
        }
    }
    Ok(resolved)
}

fn resolve_mapping_columns(options: &MergeOptions, union: &[String]) -> Result<Vec<String>, SchemaError> {
    let columns = match &options.mapping_columns {
        None => union.to_vec(),
        Some(requested) => {
            let mut out: Vec<String> = Vec::with_capacity(requested.len());
            for name in requested {
                let idx = find_column(union, name).ok_or_else(|| SchemaError::UnknownMappingColumn {
                    column: name.clone(),
                    available: union.to_vec(),
                })?;
                if !out.contains(&union[idx]) {
                    out.push(union[idx].clone());
                }
            }
            out
        }
    };

    for column in &columns {
        let mapped = format!("{}{}", options.mapping_prefix, column);
        if is_reserved(&mapped) {
            return Err(SchemaError::MappingNameClash {
                column: column.clone(),
                mapped,
            });
        }
    }

    Ok(columns)
}
