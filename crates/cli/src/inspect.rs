// columns / preview: look at a source before merging it

use mdmerge_engine::schema::{col_letter, harmonize_headers};
use mdmerge_engine::Table;
use mdmerge_io::{describe, load, LoadOptions};

use crate::util::{display_width, pad_right};
use crate::CliError;

/// Minimum preview column width, so short headers stay readable.
const MIN_COL_WIDTH: usize = 4;

fn load_for_inspect(source: &str, sheet: Option<String>, header_row: usize) -> Result<Table, CliError> {
    let options = LoadOptions {
        sheet,
        header_row,
        ..LoadOptions::new(source)
    };
    load(source, &options).map_err(|e| CliError::load(source, e))
}

// ============================================================================
// columns
// ============================================================================

pub(crate) fn cmd_columns(
    source: String,
    sheet: Option<String>,
    header_row: usize,
    json: bool,
) -> Result<(), CliError> {
    let table = load_for_inspect(&source, sheet, header_row)?;
    let columns = harmonize_headers(&table.columns);

    if json {
        let output = serde_json::json!({
            "source": source,
            "rows": table.row_count(),
            "columns": columns,
        });
        let text = serde_json::to_string_pretty(&output).map_err(|e| CliError::internal(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    eprintln!("{}", describe(&table));
    for (i, name) in columns.iter().enumerate() {
        let raw = &table.columns[i];
        if raw.trim() == name.as_str() {
            println!("{:>4}  {}", col_letter(i), name);
        } else {
            println!("{:>4}  {}  (raw: {:?})", col_letter(i), name, raw);
        }
    }
    Ok(())
}

// ============================================================================
// preview
// ============================================================================

/// Aligned text rendering of the header plus the first `rows` data rows.
pub(crate) fn render_preview(table: &Table, columns: &[String], rows: usize, max_width: usize) -> String {
    let shown = rows.min(table.row_count());
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(c, name)| {
            (0..shown)
                .map(|r| display_width(table.cell(r, c)))
                .chain(std::iter::once(display_width(name)))
                .max()
                .unwrap_or(0)
                .clamp(MIN_COL_WIDTH, max_width.max(MIN_COL_WIDTH))
        })
        .collect();

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| pad_right(cell, w))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(columns.iter().map(String::as_str).collect()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for r in 0..shown {
        out.push_str(&line((0..columns.len()).map(|c| table.cell(r, c)).collect()));
        out.push('\n');
    }
    out
}

pub(crate) fn cmd_preview(
    source: String,
    sheet: Option<String>,
    header_row: usize,
    rows: usize,
    width: usize,
) -> Result<(), CliError> {
    let table = load_for_inspect(&source, sheet, header_row)?;
    let columns = harmonize_headers(&table.columns);

    print!("{}", render_preview(&table, &columns, rows, width));
    if table.row_count() > rows {
        eprintln!("({} of {} rows shown)", rows, table.row_count());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut t = Table::new("t", vec!["Key".into(), "Name".into()]);
        t.push_row(vec!["US".into(), "United States of America".into()]);
        t.push_row(vec!["DE".into(), "Germany".into()]);
        t
    }

    #[test]
    fn preview_aligns_and_truncates() {
        let t = table();
        let columns = harmonize_headers(&t.columns);
        let text = render_preview(&t, &columns, 5, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Key  | Name");
        assert_eq!(lines[1], "-----+-----------");
        assert_eq!(lines[2], "US   | United S..");
        assert_eq!(lines[3], "DE   | Germany");
    }

    #[test]
    fn preview_limits_rows() {
        let t = table();
        let columns = harmonize_headers(&t.columns);
        let text = render_preview(&t, &columns, 1, 10);
        assert_eq!(text.lines().count(), 3);
    }
}
