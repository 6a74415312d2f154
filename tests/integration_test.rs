use olric_exporter::client::{OlricClient, Probe};
use olric_exporter::config::{ExporterConfig, ProbeCommand, WebConfig};
use olric_exporter::error::{ExporterError, Result};
use olric_exporter::metrics::{PrometheusExporter, UpCollector};
use prometheus::Registry;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Minimal RESP node: answers every command with the same canned reply and
/// records the command names it saw.
struct FakeOlric {
    address: String,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeOlric {
    fn start(reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let commands = Arc::new(Mutex::new(Vec::new()));

        let seen = commands.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let seen = seen.clone();
                thread::spawn(move || serve_connection(stream, reply, seen));
            }
        });

        Self { address, commands }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

fn serve_connection(stream: TcpStream, reply: &str, seen: Arc<Mutex<Vec<String>>>) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let Some(count) = line.trim_end().strip_prefix('*') else {
            return;
        };
        let count: usize = count.parse().unwrap_or(0);

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let mut header = String::new();
            let mut value = String::new();
            if reader.read_line(&mut header).unwrap_or(0) == 0
                || reader.read_line(&mut value).unwrap_or(0) == 0
            {
                return;
            }
            args.push(value.trim_end().to_string());
        }

        if let Some(name) = args.first() {
            seen.lock().unwrap().push(name.to_uppercase());
        }
        if writer.write_all(reply.as_bytes()).is_err() {
            return;
        }
    }
}

/// Accepts connections and never writes a byte back.
fn stalled_node() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    address
}

fn unused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

fn config(address: &str) -> ExporterConfig {
    ExporterConfig::new(address, Duration::from_millis(500)).unwrap()
}

#[test]
fn test_error_types() {
    let err = ExporterError::Query {
        address: "olric:3320".to_string(),
        command: "STATS".to_string(),
        reason: "boom".to_string(),
    };

    assert!(err.to_string().contains("olric:3320"));
    assert!(err.to_string().contains("STATS"));
    assert!(err.is_probe_failure());
    assert!(!ExporterError::Config("bad".to_string()).is_probe_failure());
}

#[test]
fn test_version_const() {
    assert!(!olric_exporter::VERSION.is_empty());
}

#[test]
fn test_probe_sends_stats_to_healthy_node() {
    let node = FakeOlric::start("+OK\r\n");
    let client = OlricClient::new(&config(&node.address));

    client.check().unwrap();
    assert!(node.commands().contains(&"STATS".to_string()));
}

#[test]
fn test_probe_can_ping_instead() {
    let node = FakeOlric::start("+PONG\r\n");
    let client = OlricClient::new(&config(&node.address).with_probe(ProbeCommand::Ping));

    client.check().unwrap();
    let commands = node.commands();
    assert!(commands.contains(&"PING".to_string()));
    assert!(!commands.contains(&"STATS".to_string()));
}

#[test]
fn test_probe_reports_rejected_query() {
    let node = FakeOlric::start("-ERR internal failure\r\n");
    let err = OlricClient::new(&config(&node.address)).check().unwrap_err();

    assert!(err.is_probe_failure());
}

#[test]
fn test_probe_gives_up_on_stalled_node() {
    let address = stalled_node();
    let client = OlricClient::new(
        &ExporterConfig::new(address, Duration::from_millis(300)).unwrap(),
    );

    let started = Instant::now();
    let err = client.check().unwrap_err();

    assert!(err.is_probe_failure());
    assert!(started.elapsed() < Duration::from_secs(2));
}

async fn scrape(address: &str, web_path: &str) -> Result<String> {
    let registry = Registry::new();
    let collector = UpCollector::new(OlricClient::new(&config(address)), tracing::Span::none())?;
    registry.register(Box::new(collector))?;

    let exporter = PrometheusExporter::new(registry, WebConfig::new("127.0.0.1:0", web_path)?);
    let listener = exporter.bind().await?;
    let http_address = listener.local_addr()?;

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        exporter
            .serve(listener, async {
                let _ = stopped.await;
            })
            .await
    });

    let body = reqwest::get(format!("http://{}{}", http_address, web_path))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let _ = stop.send(());
    server.await.unwrap()?;
    Ok(body)
}

#[tokio::test]
async fn test_metrics_endpoint_reports_up() {
    let node = FakeOlric::start("+OK\r\n");

    let body = scrape(&node.address, "/metrics").await.unwrap();
    assert!(body.contains("olric_up 1"));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_down_without_listener() {
    let body = scrape(&unused_address(), "/metrics").await.unwrap();
    assert!(body.contains("olric_up 0"));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_down_on_failed_query() {
    let node = FakeOlric::start("-ERR stats unavailable\r\n");

    let body = scrape(&node.address, "/custom").await.unwrap();
    assert!(body.contains("olric_up 0"));
}

#[tokio::test]
async fn test_landing_page_links_metrics() {
    let registry = Registry::new();
    let exporter = PrometheusExporter::new(
        registry,
        WebConfig::new("127.0.0.1:0", "/metrics").unwrap(),
    );
    let listener = exporter.bind().await.unwrap();
    let http_address = listener.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        exporter
            .serve(listener, async {
                let _ = stopped.await;
            })
            .await
    });

    let body = reqwest::get(format!("http://{}/", http_address))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("<h1>Olric Exporter</h1>"));
    assert!(body.contains("href='/metrics'"));

    let _ = stop.send(());
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_overlapping_scrapes() {
    let node = FakeOlric::start("+OK\r\n");

    let (first, second) = tokio::join!(
        scrape(&node.address, "/metrics"),
        scrape(&node.address, "/metrics")
    );
    assert!(first.unwrap().contains("olric_up 1"));
    assert!(second.unwrap().contains("olric_up 1"));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_down_for_stalled_node() {
    let address = stalled_node();

    let started = Instant::now();
    let body = scrape(&address, "/metrics").await.unwrap();

    assert!(body.contains("olric_up 0"));
    assert!(started.elapsed() < Duration::from_secs(3));
}
