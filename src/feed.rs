//! Source feed access and CSV decoding.
//!
//! The feed is a spreadsheet CSV export fetched over HTTP. A local path or
//! `file://` URL can stand in for it (offline use, fixtures).

use std::path::PathBuf;
use std::time::Duration;

use csv::ReaderBuilder;

use crate::error::DashboardError;
use crate::types::{Config, Dataset, Record, Schema};

const USER_AGENT: &str = concat!("visitboard/", env!("CARGO_PKG_VERSION"));

/// Something that can produce the raw CSV text of the feed.
pub trait FeedSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    fn fetch(&self) -> Result<String, DashboardError>;
}

/// Spreadsheet export over HTTP(S).
pub struct HttpFeed {
    client: reqwest::blocking::Client,
    url: url::Url,
}

impl HttpFeed {
    pub fn new(url: url::Url, timeout: Duration) -> Result<Self, DashboardError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, url })
    }
}

impl FeedSource for HttpFeed {
    fn describe(&self) -> String {
        // Export URLs carry the sheet id; the host is enough for logs.
        format!("{}://{}", self.url.scheme(), self.url.host_str().unwrap_or("?"))
    }

    fn fetch(&self) -> Result<String, DashboardError> {
        let resp = self.client.get(self.url.clone()).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DashboardError::Fetch(format!(
                "{} returned {}",
                self.describe(),
                status
            )));
        }
        Ok(resp.text()?)
    }
}

/// CSV file on local disk.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeed {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, DashboardError> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            DashboardError::Fetch(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }
}

/// Build a feed source from a configured location.
pub fn source_from_location(
    location: &str,
    timeout: Duration,
) -> Result<Box<dyn FeedSource>, DashboardError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(DashboardError::Configuration(
            "No feed configured. Set feedUrl in config.json or pass --feed".to_string(),
        ));
    }

    if location.starts_with("http://") || location.starts_with("https://") {
        let url = url::Url::parse(location)
            .map_err(|e| DashboardError::Configuration(format!("Invalid feed URL: {}", e)))?;
        return Ok(Box::new(HttpFeed::new(url, timeout)?));
    }

    if location.starts_with("file://") {
        let path = url::Url::parse(location)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| {
                DashboardError::Configuration(format!("Invalid file URL: {}", location))
            })?;
        return Ok(Box::new(FileFeed::new(path)));
    }

    Ok(Box::new(FileFeed::new(location)))
}

/// Decode CSV text into a dataset, resolving the column schema.
///
/// Rows narrower than `min_columns` are dropped here so nothing downstream
/// indexes past the end of a row.
pub fn decode_csv(text: &str, config: &Config) -> Result<Dataset, DashboardError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let schema = Schema::resolve(&headers, &config.columns, config.min_columns)?;

    let mut records = Vec::new();
    let mut dropped_rows = 0;
    for row in reader.records() {
        let row = row?;
        if row.len() < config.min_columns {
            dropped_rows += 1;
            continue;
        }
        records.push(Record::from_cells(row.iter()));
    }

    if dropped_rows > 0 {
        log::warn!(
            "Dropped {} malformed row(s) with fewer than {} columns",
            dropped_rows,
            config.min_columns
        );
    }

    Ok(Dataset {
        headers,
        schema,
        records,
        dropped_rows,
    })
}

/// Fetch and decode in one step.
pub fn load_dataset(source: &dyn FeedSource, config: &Config) -> Result<Dataset, DashboardError> {
    let started = std::time::Instant::now();
    let text = source.fetch()?;
    let dataset = decode_csv(&text, config)?;
    log::info!(
        "Loaded {} rows x {} columns from {} in {}ms",
        dataset.records.len(),
        dataset.column_count(),
        source.describe(),
        started.elapsed().as_millis()
    );
    Ok(dataset)
}
