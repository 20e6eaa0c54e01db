use std::collections::HashMap;

use crate::config::{DuplicatePolicy, MergeOptions};
use crate::error::{MergeError, SchemaError};
use crate::key::KeyTuple;
use crate::model::{
    KeyGroup, MergeMeta, MergeResult, MergeWarning, SourceSystem, Table, ERP_SYSTEM_COLUMN,
    MDG_KEY_COLUMN, MD_MAPPING, MD_TABLE,
};
use crate::schema::Schema;
use crate::summary::{compute_summary, duplicate_keys};

/// Merge the S4 and ECC tables into MDtable and MDmapping.
///
/// Rows are grouped by their key tuple. Each group becomes one MDtable row whose
/// cells come from the first S4 row of the group where S4 has the column, and
/// from the first ECC row otherwise. Every input row becomes one MDmapping row.
pub fn merge(s4: &Table, ecc: &Table, options: &MergeOptions) -> Result<MergeResult, MergeError> {
    if options.key_fields.is_empty() {
        return Err(SchemaError::NoKeyFields.into());
    }
    for (system, table) in [(SourceSystem::S4, s4), (SourceSystem::Ecc, ecc)] {
        if table.is_empty() {
            return Err(MergeError::EmptyInput(system));
        }
    }

    let schema = Schema::build(s4, ecc, options)?;
    let mut warnings = Vec::new();

    let s4_keys = row_keys(SourceSystem::S4, s4, &schema, options, &mut warnings);
    let ecc_keys = row_keys(SourceSystem::Ecc, ecc, &schema, options, &mut warnings);
    let groups = group_rows(&s4_keys, &ecc_keys);

    if !warnings.is_empty() {
        tracing::warn!(rows = warnings.len(), "rows with blank key fields");
    }

    let duplicates = duplicate_keys(&groups);
    if !duplicates.is_empty() {
        if options.on_duplicate == DuplicatePolicy::Error {
            return Err(MergeError::AmbiguousKey(duplicates));
        }
        tracing::warn!(keys = duplicates.len(), "duplicate keys, keeping first row per key");
        warnings.extend(duplicate_warnings(s4, ecc, &groups));
    }

    let md_table = build_md_table(s4, ecc, &schema, &groups);
    let md_mapping = build_md_mapping(s4, ecc, &schema, options, &s4_keys, &ecc_keys);
    let summary = compute_summary(&schema.key_fields, &groups, &warnings);

    tracing::debug!(
        groups = groups.len(),
        overlapping = summary.overlapping,
        duplicates = summary.duplicates.len(),
        warnings = warnings.len(),
        "merge complete"
    );

    Ok(MergeResult {
        meta: MergeMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            key_transform: options.key_transform.to_string(),
            mdg_key_style: options.mdg_key.to_string(),
            on_duplicate: options.on_duplicate.to_string(),
        },
        summary,
        md_table,
        md_mapping,
        warnings,
    })
}

/// Normalized key of one input row and the MDGKey derived from it.
#[derive(Debug, Clone)]
struct RowKey {
    tuple: KeyTuple,
    mdg_key: String,
}

/// Key of every row of one source, in row order.
fn row_keys(
    system: SourceSystem,
    table: &Table,
    schema: &Schema,
    options: &MergeOptions,
    warnings: &mut Vec<MergeWarning>,
) -> Vec<RowKey> {
    let key_cols = schema.key_indices(system);
    let mut keys = Vec::with_capacity(table.row_count());

    for row in 0..table.row_count() {
        let tuple = KeyTuple::from_raw(key_cols.iter().map(|&c| table.cell(row, c)), options.key_transform);
        let blanks = tuple.blank_positions();
        if !blanks.is_empty() {
            warnings.push(MergeWarning::BlankKey {
                system,
                row: table.row_number(row),
                fields: blanks.iter().map(|&i| schema.key_fields[i].clone()).collect(),
            });
        }
        let mdg_key = tuple.mdg_key(options.mdg_key);
        keys.push(RowKey { tuple, mdg_key });
    }

    keys
}

/// Group rows by key tuple in first-seen order: S4 rows first, then ECC.
fn group_rows(s4_keys: &[RowKey], ecc_keys: &[RowKey]) -> Vec<KeyGroup> {
    let mut groups: Vec<KeyGroup> = Vec::new();
    let mut index: HashMap<&KeyTuple, usize> = HashMap::new();

    for (system, keys) in [(SourceSystem::S4, s4_keys), (SourceSystem::Ecc, ecc_keys)] {
        for (row, key) in keys.iter().enumerate() {
            let slot = *index.entry(&key.tuple).or_insert_with(|| {
                groups.push(KeyGroup::new(key.mdg_key.clone()));
                groups.len() - 1
            });
            groups[slot].rows_mut(system).push(row);
        }
    }

    groups
}

fn duplicate_warnings(s4: &Table, ecc: &Table, groups: &[KeyGroup]) -> Vec<MergeWarning> {
    let mut out = Vec::new();
    for (system, table) in [(SourceSystem::S4, s4), (SourceSystem::Ecc, ecc)] {
        for group in groups {
            let rows = group.rows(system);
            let Some((&first, rest)) = rows.split_first() else {
                continue;
            };
            for &row in rest {
                out.push(MergeWarning::DuplicateKey {
                    system,
                    row: table.row_number(row),
                    first_row: table.row_number(first),
                    mdg_key: group.mdg_key.clone(),
                });
            }
        }
    }
    out
}

/// Source-table position of each largest-schema column, per system.
fn column_map(schema: &Schema, system: SourceSystem, columns: &[String]) -> Vec<Option<usize>> {
    columns.iter().map(|c| schema.source_index(system, c)).collect()
}

fn build_md_table(s4: &Table, ecc: &Table, schema: &Schema, groups: &[KeyGroup]) -> Table {
    let mut columns = Vec::with_capacity(schema.columns.len() + 1);
    columns.push(MDG_KEY_COLUMN.to_string());
    columns.extend(schema.columns.iter().cloned());
    let mut table = Table::new(MD_TABLE, columns);

    let s4_map = column_map(schema, SourceSystem::S4, &schema.columns);
    let ecc_map = column_map(schema, SourceSystem::Ecc, &schema.columns);

    for group in groups {
        let s4_row = group.representative(SourceSystem::S4);
        let ecc_row = group.representative(SourceSystem::Ecc);

        let mut row = Vec::with_capacity(schema.columns.len() + 1);
        row.push(group.mdg_key.clone());
        for (s4_col, ecc_col) in s4_map.iter().zip(&ecc_map) {
            let value = match (s4_row.zip(*s4_col), ecc_row.zip(*ecc_col)) {
                (Some((r, c)), _) => s4.cell(r, c),
                (None, Some((r, c))) => ecc.cell(r, c),
                (None, None) => "",
            };
            row.push(value.to_string());
        }
        table.push_row(row);
    }

    table
}

fn build_md_mapping(
    s4: &Table,
    ecc: &Table,
    schema: &Schema,
    options: &MergeOptions,
    s4_keys: &[RowKey],
    ecc_keys: &[RowKey],
) -> Table {
    let mut columns = Vec::with_capacity(schema.mapping_columns.len() + 2);
    columns.push(MDG_KEY_COLUMN.to_string());
    columns.push(ERP_SYSTEM_COLUMN.to_string());
    columns.extend(
        schema
            .mapping_columns
            .iter()
            .map(|c| format!("{}{}", options.mapping_prefix, c)),
    );
    let mut mapping = Table::new(MD_MAPPING, columns);

    for (system, table, keys) in [(SourceSystem::S4, s4, s4_keys), (SourceSystem::Ecc, ecc, ecc_keys)] {
        let col_map = column_map(schema, system, &schema.mapping_columns);
        for (row, key) in keys.iter().enumerate() {
            let mut out = Vec::with_capacity(col_map.len() + 2);
            out.push(key.mdg_key.clone());
            out.push(system.label().to_string());
            out.extend(
                col_map
                    .iter()
                    .map(|c| c.map(|c| table.cell(row, c)).unwrap_or("").to_string()),
            );
            mapping.push_row(out);
        }
    }

    mapping
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
