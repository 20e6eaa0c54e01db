//! Turn a file path or URL into a `Table`.

use std::path::Path;

use mdmerge_engine::Table;

use crate::error::IoError;
use crate::fetch::{is_url, FetchConfig, Fetcher};

/// Decoded shape of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text; delimiter sniffed.
    Csv,
    /// Tab-separated text.
    Tsv,
    /// Any workbook calamine can open.
    Excel,
}

const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Pick a decoder: magic bytes, then content type, then extension; CSV otherwise.
pub fn detect_format(bytes: &[u8], content_type: Option<&str>, name: &str) -> SourceFormat {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return SourceFormat::Excel;
    }

    if let Some(ct) = content_type.map(|c| c.to_ascii_lowercase()) {
        if ct.contains("spreadsheetml") || ct.contains("ms-excel") || ct.contains("opendocument.spreadsheet") {
            return SourceFormat::Excel;
        }
        if ct.contains("tab-separated") {
            return SourceFormat::Tsv;
        }
        if ct.contains("csv") {
            return SourceFormat::Csv;
        }
    }

    let path = name.split(['?', '#']).next().unwrap_or(name);
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => SourceFormat::Excel,
        Some("tsv" | "tab") => SourceFormat::Tsv,
        _ => SourceFormat::Csv,
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Name given to the resulting table (e.g. `S4`).
    pub name: String,
    /// Worksheet for Excel sources; first sheet when `None`.
    pub sheet: Option<String>,
    /// 1-indexed row holding column names.
    pub header_row: usize,
    pub fetch: FetchConfig,
}

impl LoadOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheet: None,
            header_row: 1,
            fetch: FetchConfig::default(),
        }
    }
}

/// Load a table from a local path or an http(s) URL.
pub fn load(location: &str, options: &LoadOptions) -> Result<Table, IoError> {
    let (bytes, content_type, source) = if is_url(location) {
        let fetched = Fetcher::new(options.fetch.clone())?.fetch(location)?;
        (fetched.bytes, fetched.content_type, fetched.url)
    } else {
        let path = Path::new(location);
        let bytes = std::fs::read(path).map_err(|source| IoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        (bytes, None, location.to_string())
    };

    let format = detect_format(&bytes, content_type.as_deref(), location);
    let table = load_bytes(bytes, format, location, options)?;
    tracing::info!(
        table = %table.name,
        %location,
        %source,
        ?format,
        rows = table.row_count(),
        columns = table.column_count(),
        "loaded"
    );
    Ok(table)
}

/// Decode already-acquired bytes.
pub fn load_bytes(
    bytes: Vec<u8>,
    format: SourceFormat,
    location: &str,
    options: &LoadOptions,
) -> Result<Table, IoError> {
    let grid = match format {
        SourceFormat::Excel => crate::xlsx::read_grid(bytes, options.sheet.as_deref(), location)?,
        SourceFormat::Csv | SourceFormat::Tsv => {
            let text = crate::csv::decode_text(bytes);
            let delimiter = if format == SourceFormat::Tsv {
                b'\t'
            } else {
                crate::csv::sniff_delimiter(&text)
            };
            crate::csv::parse_grid(&text, delimiter, location)?
        }
    };
    grid_to_table(&options.name, grid, options.header_row, location)
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn used_width(row: &[String]) -> usize {
    row.iter().rposition(|c| !c.trim().is_empty()).map_or(0, |i| i + 1)
}

/// Build a table from raw rows: `header_row` (1-indexed) names the columns,
/// blank rows below it are skipped and trailing empty columns dropped. Each
/// data row keeps its sheet row number. A source with no rows at all gives
/// an empty table.
pub fn grid_to_table(
    name: &str,
    mut grid: Vec<Vec<String>>,
    header_row: usize,
    location: &str,
) -> Result<Table, IoError> {
    if grid.iter().all(|r| is_blank_row(r)) && header_row > 0 {
        tracing::debug!(%location, "source has no rows");
        return Ok(Table::new(name, Vec::new()));
    }
    if header_row == 0 || grid.len() < header_row {
        return Err(IoError::MissingHeader {
            location: location.to_string(),
            header_row,
            rows: grid.len(),
        });
    }

    let data: Vec<(usize, Vec<String>)> = grid
        .split_off(header_row)
        .into_iter()
        .enumerate()
        .map(|(i, r)| (header_row + i + 1, r))
        .filter(|(_, r)| !is_blank_row(r))
        .collect();
    let mut header = grid.pop().unwrap_or_default();

    let width = data
        .iter()
        .map(|(_, r)| used_width(r))
        .chain(std::iter::once(used_width(&header)))
        .max()
        .unwrap_or(0);
    header.resize(width, String::new());

    let mut table = Table::new(name, header);
    for (sheet_row, mut row) in data {
        row.truncate(width);
        table.push_row_at(row, sheet_row);
    }
    Ok(table)
}

/// Short description used by listings: `"S4: 12 rows x 5 columns"`.
pub fn describe(table: &Table) -> String {
    format!(
        "{}: {} rows x {} columns",
        table.name,
        table.row_count(),
        table.column_count()
    )
}
