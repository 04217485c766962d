//! Error types of the exporter

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed on format the time: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("Failed on parse the time: {0}")]
    TimeParse(#[from] time::error::Parse),

    #[error("Failed on write the XML document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("KMZ archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed on encode the {format} document: {reason}")]
    Encode { format: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Device `{0}` not found")]
    DeviceNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
