use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("cannot read settings file {0}")]
    SettingsRead(PathBuf, #[source] std::io::Error),

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("invalid coverage-id template: {0}")]
    InvalidTemplate(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} timed out after {attempts} attempts")]
    TimedOut { url: String, attempts: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid coverage window: end {end} precedes start {start}")]
    InvalidWindow { start: String, end: String },

    #[error("no time period in coverage description for {coverage_id}")]
    MissingTimePeriod { coverage_id: String },

    #[error("no run available for data type {0}")]
    NoRunAvailable(String),
}
