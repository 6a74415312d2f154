//! Startup configuration for the exporter.
//!
//! Everything here is built once from the command line and then shared
//! read-only with the collector and the HTTP server.

use crate::{ExporterError, Result};
use std::fmt;
use std::time::Duration;
use tracing::Span;

pub const DEFAULT_OLRIC_ADDRESS: &str = "localhost:3320";
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9150";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Query used to decide whether the node is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProbeCommand {
    #[default]
    Stats,
    Ping,
}

impl ProbeCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeCommand::Stats => "STATS",
            ProbeCommand::Ping => "PING",
        }
    }
}

impl fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target node settings plus the logger the collector reports through.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub address: String,
    pub timeout: Duration,
    pub probe: ProbeCommand,
    pub logger: Span,
}

impl ExporterConfig {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(ExporterError::Config(
                "Olric address must not be empty".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(ExporterError::Config(
                "Olric timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            address,
            timeout,
            probe: ProbeCommand::default(),
            logger: Span::none(),
        })
    }

    pub fn with_probe(mut self, probe: ProbeCommand) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_logger(mut self, logger: Span) -> Self {
        self.logger = logger;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub listen_address: String,
    pub telemetry_path: String,
}

impl WebConfig {
    pub fn new(listen_address: impl Into<String>, telemetry_path: impl Into<String>) -> Result<Self> {
        let telemetry_path = telemetry_path.into();
        if !telemetry_path.starts_with('/') {
            return Err(ExporterError::Config(format!(
                "telemetry path must start with '/': {}",
                telemetry_path
            )));
        }
        if telemetry_path == "/" {
            return Err(ExporterError::Config(
                "telemetry path must not be '/', it is taken by the landing page".to_string(),
            ));
        }

        Ok(Self {
            listen_address: listen_address.into(),
            telemetry_path,
        })
    }

    pub fn bind_addresses(&self) -> Vec<String> {
        listen_candidates(&self.listen_address)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            telemetry_path: DEFAULT_TELEMETRY_PATH.to_string(),
        }
    }
}

/// Addresses to try, in order, for a listen address.
///
/// `:9150` means every interface: the IPv6 wildcard first (dual-stack on most
/// hosts), then the IPv4 wildcard for hosts without IPv6.
pub fn listen_candidates(address: &str) -> Vec<String> {
    if address.starts_with(':') {
        vec![format!("[::]{}", address), format!("0.0.0.0{}", address)]
    } else {
        vec![address.to_string()]
    }
}

/// Parse a Go-style duration such as `500ms`, `1s` or `1m30s`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ExporterError::Config("empty duration".to_string()));
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        let mut number = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
                chars.next();
            } else {
                break;
            }
        }
        if number.is_empty() {
            return Err(ExporterError::Config(format!(
                "invalid duration {:?}: expected number",
                s
            )));
        }

        let mut unit = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                break;
            }
            unit.push(ch);
            chars.next();
        }

        let value: f64 = number
            .parse()
            .map_err(|_| ExporterError::Config(format!("invalid number in duration {:?}", s)))?;

        let seconds = match unit.as_str() {
            "ns" => value / 1e9,
            "us" | "µs" => value / 1e6,
            "ms" => value / 1e3,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            "" => {
                return Err(ExporterError::Config(format!(
                    "missing unit in duration {:?}",
                    s
                )))
            }
            other => {
                return Err(ExporterError::Config(format!(
                    "unknown unit {:?} in duration {:?}",
                    other, s
                )))
            }
        };

        total = Duration::try_from_secs_f64(seconds)
            .ok()
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| ExporterError::Config(format!("duration {:?} is out of range", s)))?;
    }

    Ok(total)
}
