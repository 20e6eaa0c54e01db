// Excel import (calamine) and export (rust_xlsxwriter)

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use mdmerge_engine::Table;

use crate::error::IoError;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read one sheet of a workbook (xlsx, xlsm, xls, xlsb, ods) into a grid of
/// display strings. Rows and columns are absolute: row 0 is sheet row 1.
pub fn read_grid(bytes: Vec<u8>, sheet: Option<&str>, location: &str) -> Result<Vec<Vec<String>>, IoError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| IoError::Workbook {
        location: location.to_string(),
        message: e.to_string(),
    })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|s| s.as_str() == wanted)
            .or_else(|| sheet_names.iter().find(|s| s.eq_ignore_ascii_case(wanted)))
            .cloned()
            .ok_or_else(|| IoError::SheetNotFound {
                location: location.to_string(),
                sheet: wanted.to_string(),
                available: sheet_names.clone(),
            })?,
        None => sheet_names.first().cloned().ok_or_else(|| IoError::Workbook {
            location: location.to_string(),
            message: "workbook contains no sheets".into(),
        })?,
    };

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| IoError::Workbook {
        location: location.to_string(),
        message: format!("failed to read sheet '{sheet_name}': {e}"),
    })?;

    // Ranges start at the first used cell, not A1.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut grid: Vec<Vec<String>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(render_cell));
        grid.push(cells);
    }

    tracing::debug!(sheet = %sheet_name, rows = grid.len(), "workbook sheet read");
    Ok(grid)
}

/// Render a calamine cell the way it displays in a spreadsheet.
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => format_datetime(ndt),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn format_datetime(ndt: chrono::NaiveDateTime) -> String {
    if ndt.time() == chrono::NaiveTime::MIN {
        ndt.format("%Y-%m-%d").to_string()
    } else {
        ndt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write one table to its own worksheet. Every cell is text so values like
/// `001` keep their leading zeros.
fn write_table(worksheet: &mut Worksheet, table: &Table, sheet_name: &str) -> Result<(), IoError> {
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    for (c, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &header_format)?;
    }

    for r in 0..table.row_count() {
        for c in 0..table.column_count() {
            let value = table.cell(r, c);
            if !value.is_empty() {
                worksheet.write_string((r + 1) as u32, c as u16, value)?;
            }
        }
    }

    if table.column_count() > 0 {
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofilter(0, 0, table.row_count() as u32, (table.column_count() - 1) as u16)?;
        worksheet.autofit();
    }

    Ok(())
}

fn build_workbook(table: &Table, sheet_name: &str) -> Result<XlsxWorkbook, IoError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet();
    write_table(worksheet, table, sheet_name)?;
    Ok(workbook)
}

/// Export a table as a single-sheet xlsx file.
pub fn export(table: &Table, sheet_name: &str, path: &Path) -> Result<(), IoError> {
    let mut workbook = build_workbook(table, sheet_name)?;
    workbook.save(path)?;
    Ok(())
}

/// Serialize a table as single-sheet xlsx bytes.
pub fn to_bytes(table: &Table, sheet_name: &str) -> Result<Vec<u8>, IoError> {
    let mut workbook = build_workbook(table, sheet_name)?;
    Ok(workbook.save_to_buffer()?)
}
