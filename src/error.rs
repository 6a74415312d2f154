use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Failed to connect to Olric at {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("Failed to run {command} against Olric at {address}: {reason}")]
    Query {
        address: String,
        command: String,
        reason: String,
    },

    #[error("Failed to listen on {address}: {source}")]
    Listen {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// True for the failures a scrape degrades to `up = 0` instead of surfacing.
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            ExporterError::Connection { .. } | ExporterError::Query { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
