pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{ExporterError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
