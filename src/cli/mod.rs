use crate::config::{
    parse_duration, ExporterConfig, ProbeCommand, WebConfig, DEFAULT_LISTEN_ADDRESS,
    DEFAULT_OLRIC_ADDRESS, DEFAULT_TELEMETRY_PATH,
};
use crate::logging::{LogFormat, LogLevel};
use crate::Result;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "olric_exporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prometheus exporter reporting whether an Olric node can be reached", long_about = None)]
pub struct Cli {
    #[arg(long = "olric.address", default_value = DEFAULT_OLRIC_ADDRESS, help = "Olric server address")]
    pub olric_address: String,

    #[arg(
        long = "olric.timeout",
        default_value = "1s",
        value_parser = parse_timeout,
        help = "Olric connect timeout"
    )]
    pub olric_timeout: Duration,

    #[arg(
        long = "olric.probe",
        value_enum,
        default_value_t = ProbeCommand::Stats,
        help = "Query used to decide whether Olric is up"
    )]
    pub olric_probe: ProbeCommand,

    #[arg(
        long = "web.listen-address",
        default_value = DEFAULT_LISTEN_ADDRESS,
        help = "Address to listen on for web interface and telemetry; ':port' listens on all interfaces"
    )]
    pub listen_address: String,

    #[arg(
        long = "web.telemetry-path",
        default_value = DEFAULT_TELEMETRY_PATH,
        help = "Path under which to expose metrics"
    )]
    pub telemetry_path: String,

    #[arg(
        long = "log.level",
        value_enum,
        default_value_t = LogLevel::Info,
        help = "Only log messages with the given severity or above"
    )]
    pub log_level: LogLevel,

    #[arg(
        long = "log.format",
        value_enum,
        default_value_t = LogFormat::Logfmt,
        help = "Output format of log messages"
    )]
    pub log_format: LogFormat,
}

impl Cli {
    /// Must run after the subscriber is installed so the logger span is live.
    pub fn exporter_config(&self) -> Result<ExporterConfig> {
        let logger = tracing::error_span!("olric", address = %self.olric_address);

        Ok(ExporterConfig::new(self.olric_address.clone(), self.olric_timeout)?
            .with_probe(self.olric_probe)
            .with_logger(logger))
    }

    pub fn web_config(&self) -> Result<WebConfig> {
        WebConfig::new(self.listen_address.clone(), self.telemetry_path.clone())
    }
}

fn parse_timeout(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}
