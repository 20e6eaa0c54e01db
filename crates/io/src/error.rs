use std::path::PathBuf;

use thiserror::Error;

const SHARING_HINT: &str = "if this is a Google Sheet, set sharing to 'Anyone with the link can view', \
or download it as Excel and pass the file instead";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV in {location}: {message}")]
    Csv { location: String, message: String },
    #[error("cannot open workbook {location}: {message}")]
    Workbook { location: String, message: String },
    #[error("sheet '{sheet}' not found in {location} (sheets: {})", available.join(", "))]
    SheetNotFound {
        location: String,
        sheet: String,
        available: Vec<String>,
    },
    #[error("{location} has no header row {header_row} (only {rows} rows)")]
    MissingHeader {
        location: String,
        header_row: usize,
        rows: usize,
    },
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("fetch {url} failed: {message}")]
    Fetch { url: String, message: String },
    #[error("fetch {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("{url} returned HTML instead of a spreadsheet")]
    HtmlResponse { url: String },
    #[error("{url} response exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
    #[error("xlsx export failed: {0}")]
    Xlsx(String),
}

impl IoError {
    /// Actionable follow-up for the user, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::HtmlResponse { .. } => Some(SHARING_HINT),
            Self::HttpStatus { status: 401 | 403 | 404, .. } => Some(SHARING_HINT),
            Self::Workbook { .. } => Some("check that the file is a valid xlsx, xls, xlsb or ods workbook"),
            _ => None,
        }
    }

    /// True for failures while producing output files.
    pub fn is_export(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Xlsx(_))
    }
}

impl From<rust_xlsxwriter::XlsxError> for IoError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Xlsx(e.to_string())
    }
}
