use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    CsvWrite(#[from] csv::Error),

    /// 並行取得ワーカーでの失敗（ワーカー番号と作業項目付き）
    #[error("worker {worker} failed on [{item}]: {source}")]
    WorkerFailed {
        worker: usize,
        item: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
