use std::path::{Path, PathBuf};

use mdmerge_engine::{MergeResult, OutputFormat, Table};

use crate::error::IoError;

/// Write one table in the requested format. The table name doubles as the
/// worksheet name.
pub fn export_table(table: &Table, path: &Path, format: OutputFormat) -> Result<(), IoError> {
    match format {
        OutputFormat::Xlsx => crate::xlsx::export(table, &table.name, path),
        OutputFormat::Csv => crate::csv::export(table, path),
    }
}

/// Single-sheet xlsx bytes for a table, sheet named after the table.
pub fn xlsx_bytes(table: &Table) -> Result<Vec<u8>, IoError> {
    crate::xlsx::to_bytes(table, &table.name)
}

/// Write `MDtable.<ext>` and `MDmapping.<ext>` into `dir`, creating it if
/// needed. Returns the written paths, MDtable first.
pub fn write_outputs(result: &MergeResult, dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>, IoError> {
    std::fs::create_dir_all(dir).map_err(|source| IoError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(2);
    for table in [&result.md_table, &result.md_mapping] {
        let path = dir.join(format!("{}.{}", table.name, format.extension()));
        export_table(table, &path, format)?;
        tracing::info!(path = %path.display(), rows = table.row_count(), "wrote");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdmerge_engine::{merge, MergeOptions};
    use tempfile::tempdir;

    fn result() -> MergeResult {
        let mut s4 = Table::new("S4", vec!["Country".into(), "Division".into()]);
        s4.push_row(vec!["US".into(), "A".into()]);
        let mut ecc = Table::new("ECC", vec!["Country".into(), "Division".into(), "Region".into()]);
        ecc.push_row(vec!["US".into(), "B".into(), "NA".into()]);
        merge(&s4, &ecc, &MergeOptions::new(["Country"])).unwrap()
    }

    #[test]
    fn writes_both_csv_outputs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let paths = write_outputs(&result(), &out, OutputFormat::Csv).unwrap();

        assert_eq!(paths, vec![out.join("MDtable.csv"), out.join("MDmapping.csv")]);
        let table = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(table, "MDGKey,Country,Division,Region\nUS,US,A,NA\n");
        let mapping = std::fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(mapping.lines().count(), 3);
        assert!(mapping.starts_with("MDGKey,ERPSystem,ERPCountry,ERPDivision,ERPRegion\n"));
    }

    #[test]
    fn writes_both_xlsx_outputs() {
        let dir = tempdir().unwrap();
        let paths = write_outputs(&result(), dir.path(), OutputFormat::Xlsx).unwrap();
        for path in &paths {
            let bytes = std::fs::read(path).unwrap();
            assert_eq!(&bytes[..2], b"PK");
        }
        assert!(paths[1].ends_with("MDmapping.xlsx"));
    }

    #[test]
    fn xlsx_bytes_use_table_name_as_sheet() {
        let r = result();
        let bytes = xlsx_bytes(&r.md_mapping).unwrap();
        let grid = crate::xlsx::read_grid(bytes, Some("MDmapping"), "mem").unwrap();
        assert_eq!(grid[1][1], "S4");
        assert_eq!(grid[2][1], "ECC");
    }
}
