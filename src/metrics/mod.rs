pub mod collector;
pub mod exporter;

pub use collector::UpCollector;
pub use exporter::PrometheusExporter;
