//! URL acquisition for remote spreadsheets.
//!
//! `Fetcher` wraps a blocking reqwest client with retry, backoff and error
//! classification:
//! - 429 / 5xx / transport errors retry with exponential backoff
//! - other 4xx fail immediately
//! - HTML bodies (login pages, "request access" pages) are rejected
//! - bodies above the size limit are rejected
//!
//! Google Sheets edit links are rewritten to their xlsx export link first.

use std::io::Read;
use std::thread;
use std::time::Duration;

use url::Url;

use crate::error::IoError;

// ── Constants ───────────────────────────────────────────────────────

/// Browser-like agent; some hosts answer 403 to unknown clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
pub const MAX_RETRIES: u32 = 2;
pub const MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

const GOOGLE_SHEETS_HOST: &str = "docs.google.com";

// ── URL helpers ─────────────────────────────────────────────────────

pub fn is_url(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Rewrite a Google Sheets edit link (`.../spreadsheets/d/<id>/edit...`,
/// also the multi-account `.../spreadsheets/u/<n>/d/<id>/edit...`) to the
/// sheet's xlsx export URL. Returns `None` for anything else.
pub fn google_sheets_export_url(url: &Url) -> Option<String> {
    if url.host_str() != Some(GOOGLE_SHEETS_HOST) || !url.path().contains("/edit") {
        return None;
    }
    let mut segments = url.path_segments()?;
    if segments.next() != Some("spreadsheets") {
        return None;
    }
    segments.find(|s| *s == "d")?;
    let id = segments.next().filter(|id| !id.is_empty())?;
    Some(format!(
        "https://{GOOGLE_SHEETS_HOST}/spreadsheets/d/{id}/export?format=xlsx&id={id}"
    ))
}

/// Validate a URL and apply the Google Sheets rewrite.
pub fn resolve_url(location: &str) -> Result<String, IoError> {
    let url = Url::parse(location.trim()).map_err(|e| IoError::InvalidUrl {
        url: location.to_string(),
        message: e.to_string(),
    })?;
    match google_sheets_export_url(&url) {
        Some(export) => {
            tracing::debug!(from = %url, to = %export, "rewrote Google Sheets link");
            Ok(export)
        }
        None => Ok(url.to_string()),
    }
}

fn looks_like_html(content_type: Option<&str>, body: &[u8]) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("html")) {
        return true;
    }
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &body[i..])
        .unwrap_or(&[]);
    let head: Vec<u8> = start.iter().take(5).map(|b| b.to_ascii_lowercase()).collect();
    head.starts_with(b"<!") || head.starts_with(b"<html")
}

// ── Fetcher ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    /// First retry delay; doubles per attempt.
    pub backoff: Duration,
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: MAX_RETRIES,
            backoff: Duration::from_secs(1),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

/// A downloaded body plus what the server said about it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct Fetcher {
    http: reqwest::blocking::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, IoError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IoError::Fetch {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    /// GET a spreadsheet with retry + exponential backoff.
    pub fn fetch(&self, location: &str) -> Result<Fetched, IoError> {
        let url = resolve_url(location)?;
        let mut backoff = self.config.backoff;

        for attempt in 0..=self.config.max_retries {
            tracing::debug!(%url, attempt, "fetching");
            let last = attempt == self.config.max_retries;

            let resp = match self.http.get(&url).send() {
                Ok(resp) => resp,
                Err(e) => {
                    if last {
                        return Err(IoError::Fetch {
                            url,
                            message: format!("{e} (after {} attempts)", attempt + 1),
                        });
                    }
                    tracing::warn!(%url, error = %e, "retry {}/{} in {:?}", attempt + 1, self.config.max_retries, backoff);
                    thread::sleep(backoff);
                    backoff *= 2;
                    continue;
                }
            };

            let status = resp.status().as_u16();

            // Retryable: 429, 5xx
            if status == 429 || status >= 500 {
                if last {
                    return Err(IoError::HttpStatus { url, status });
                }
                tracing::warn!(%url, status, "retry {}/{} in {:?}", attempt + 1, self.config.max_retries, backoff);
                thread::sleep(backoff);
                backoff *= 2;
                continue;
            }

            if status >= 400 {
                return Err(IoError::HttpStatus { url, status });
            }

            return self.read_body(url, resp);
        }

        Err(IoError::Fetch {
            url,
            message: "no attempts made".to_string(),
        })
    }

    fn read_body(&self, url: String, resp: reqwest::blocking::Response) -> Result<Fetched, IoError> {
        let limit = self.config.max_body_bytes;
        if resp.content_length().is_some_and(|len| len > limit) {
            return Err(IoError::TooLarge { url, limit });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut bytes = Vec::new();
        resp.take(limit + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| IoError::Fetch {
                url: url.clone(),
                message: format!("failed to read response body: {e}"),
            })?;
        if bytes.len() as u64 > limit {
            return Err(IoError::TooLarge { url, limit });
        }

        if looks_like_html(content_type.as_deref(), &bytes) {
            return Err(IoError::HtmlResponse { url });
        }

        tracing::info!(%url, bytes = bytes.len(), content_type = ?content_type, "fetched");
        Ok(Fetched {
            url,
            content_type,
            bytes,
        })
    }
}
