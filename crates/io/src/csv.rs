// CSV/TSV import/export

use std::path::Path;

use mdmerge_engine::Table;

use crate::error::IoError;

/// Decode raw bytes as UTF-8, stripping a BOM. Falls back to Windows-1252
/// (common for Excel-exported CSVs) when the bytes are not valid UTF-8.
pub fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            tracing::debug!("input is not UTF-8, decoded as Windows-1252");
            decoded.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parse delimited text into rows of cells. Rows keep their own width.
/// Empty lines become empty rows, so row `i` is line `i + 1` of the text.
pub fn parse_grid(content: &str, delimiter: u8, location: &str) -> Result<Vec<Vec<String>>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::Csv {
            location: location.to_string(),
            message: e.to_string(),
        })?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        while grid.len() + 1 < line {
            grid.push(Vec::new());
        }
        grid.push(record.iter().map(String::from).collect());
    }
    Ok(grid)
}

/// Write a table as comma-separated UTF-8, header first.
pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    let write_err = |e: csv::Error| IoError::Write {
        path: path.to_path_buf(),
        source: e.into(),
    };

    let mut writer = csv::WriterBuilder::new().from_path(path).map_err(write_err)?;
    writer.write_record(&table.columns).map_err(write_err)?;

    let width = table.column_count();
    for r in 0..table.row_count() {
        writer
            .write_record((0..width).map(|c| table.cell(r, c)))
            .map_err(write_err)?;
    }

    writer.flush().map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("Country\nUS\nDE\n"), b',');
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = b"\xEF\xBB\xBFCountry,Name\n".to_vec();
        assert_eq!(decode_text(bytes), "Country,Name\n");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // "Café" in Windows-1252
        let bytes = vec![b'C', b'a', b'f', 0xE9];
        assert_eq!(decode_text(bytes), "Café");
    }

    #[test]
    fn test_parse_grid_keeps_ragged_rows() {
        let grid = parse_grid("a,b,c\n1\n2,3\n", b',', "t.csv").unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1], vec!["1"]);
        assert_eq!(grid[2], vec!["2", "3"]);
    }

    #[test]
    fn test_parse_grid_keeps_line_numbers() {
        let grid = parse_grid("Key\n\nUS\n\n\nDE\n", b',', "t.csv").unwrap();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[2], vec!["US"]);
        assert!(grid[3].is_empty());
        assert_eq!(grid[5], vec!["DE"]);
    }

    #[test]
    fn test_export_pads_short_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut table = Table::new("MDtable", vec!["MDGKey".into(), "Name".into(), "Note".into()]);
        table.push_row(vec!["001".into(), "Doe, Jane".into()]);
        export(&table, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "MDGKey,Name,Note\n001,\"Doe, Jane\",\n");
    }
}
