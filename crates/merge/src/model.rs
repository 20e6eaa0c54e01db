use serde::{Deserialize, Serialize};

/// Output column holding the synthesized merged key.
pub const MDG_KEY_COLUMN: &str = "MDGKey";
/// MDmapping column naming the row's origin system.
pub const ERP_SYSTEM_COLUMN: &str = "ERPSystem";
/// Sheet / file stem of the deduplicated output.
pub const MD_TABLE: &str = "MDtable";
/// Sheet / file stem of the provenance output.
pub const MD_MAPPING: &str = "MDmapping";

// ---------------------------------------------------------------------------
// Source systems
// ---------------------------------------------------------------------------

/// The two source systems. Declaration order is priority order: S4 wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceSystem {
    #[serde(rename = "S4")]
    S4,
    #[serde(rename = "ECC")]
    Ecc,
}

impl SourceSystem {
    /// Both systems in priority order.
    pub const ALL: [SourceSystem; 2] = [SourceSystem::S4, SourceSystem::Ecc];

    pub fn label(&self) -> &'static str {
        match self {
            Self::S4 => "S4",
            Self::Ecc => "ECC",
        }
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A named, row-oriented table of text cells.
///
/// Rows may be shorter than `columns`; missing trailing cells read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-indexed sheet row of each data row, for tables read from a file.
    #[serde(skip)]
    pub row_numbers: Vec<usize>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            row_numbers: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Push a row read from `sheet_row` of its source.
    pub fn push_row_at(&mut self, row: Vec<String>, sheet_row: usize) {
        self.row_numbers.resize(self.rows.len(), 0);
        self.rows.push(row);
        self.row_numbers.push(sheet_row);
    }

    /// Row number shown to users: the sheet row when known, else the
    /// 1-indexed data row.
    pub fn row_number(&self, row: usize) -> usize {
        match self.row_numbers.get(row) {
            Some(&n) if n > 0 => n,
            _ => row + 1,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-name column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Cell by column name; `None` when the column does not exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.column_index(column).map(|c| self.cell(row, c))
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(column)?;
        Some((0..self.rows.len()).map(|r| self.cell(r, idx)).collect())
    }
}

// ---------------------------------------------------------------------------
// Key groups
// ---------------------------------------------------------------------------

/// All rows of both sources sharing one MDGKey. Row indices are 0-based
/// positions in the source tables, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    pub mdg_key: String,
    pub s4_rows: Vec<usize>,
    pub ecc_rows: Vec<usize>,
}

impl KeyGroup {
    pub fn new(mdg_key: impl Into<String>) -> Self {
        Self {
            mdg_key: mdg_key.into(),
            s4_rows: Vec::new(),
            ecc_rows: Vec::new(),
        }
    }

    pub fn rows(&self, system: SourceSystem) -> &[usize] {
        match system {
            SourceSystem::S4 => &self.s4_rows,
            SourceSystem::Ecc => &self.ecc_rows,
        }
    }

    pub fn rows_mut(&mut self, system: SourceSystem) -> &mut Vec<usize> {
        match system {
            SourceSystem::S4 => &mut self.s4_rows,
            SourceSystem::Ecc => &mut self.ecc_rows,
        }
    }

    /// First-seen row of `system`, the one that represents it in MDtable.
    pub fn representative(&self, system: SourceSystem) -> Option<usize> {
        self.rows(system).first().copied()
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub meta: MergeMeta,
    pub summary: MergeSummary,
    #[serde(skip)]
    pub md_table: Table,
    #[serde(skip)]
    pub md_mapping: Table,
    pub warnings: Vec<MergeWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeMeta {
    pub engine_version: String,
    pub key_transform: String,
    pub mdg_key_style: String,
    pub on_duplicate: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeSummary {
    pub key_fields: Vec<String>,
    pub s4_count: usize,
    pub ecc_count: usize,
    pub mdtable_count: usize,
    pub mdmapping_count: usize,
    pub overlapping: usize,
    pub s4_only: usize,
    pub ecc_only: usize,
    pub overlapping_keys: Vec<String>,
    pub s4_only_keys: Vec<String>,
    pub ecc_only_keys: Vec<String>,
    pub duplicates: Vec<DuplicateKey>,
    pub blank_key_rows: usize,
}

/// A merged key seen more than once within one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub system: SourceSystem,
    pub mdg_key: String,
    pub count: usize,
}

/// Non-fatal findings. Row numbers come from `Table::row_number`: sheet rows
/// for loaded tables, 1-indexed data rows otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    /// One or more key components were blank after normalization.
    BlankKey {
        system: SourceSystem,
        row: usize,
        fields: Vec<String>,
    },
    /// A later row repeats a key already taken by an earlier row of the same source.
    DuplicateKey {
        system: SourceSystem,
        row: usize,
        first_row: usize,
        mdg_key: String,
    },
}

impl std::fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankKey { system, row, fields } => {
                write!(f, "{system} row {row}: blank key field(s) {}", fields.join(", "))
            }
            Self::DuplicateKey { system, row, first_row, mdg_key } => {
                write!(
                    f,
                    "{system} row {row}: key {mdg_key:?} already used by row {first_row}; row {first_row} wins"
                )
            }
        }
    }
}
