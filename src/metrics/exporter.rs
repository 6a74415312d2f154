use crate::config::WebConfig;
use crate::{ExporterError, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

struct ExporterState {
    registry: Registry,
    landing_page: String,
}

/// Serves the landing page and the metrics endpoint for a registry.
pub struct PrometheusExporter {
    registry: Registry,
    web: WebConfig,
}

impl PrometheusExporter {
    pub fn new(registry: Registry, web: WebConfig) -> Self {
        Self { registry, web }
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(ExporterState {
            registry: self.registry.clone(),
            landing_page: landing_page(&self.web.telemetry_path),
        });

        Router::new()
            .route("/", get(landing))
            .route(&self.web.telemetry_path, get(metrics))
            .with_state(state)
    }

    /// Bind the first usable candidate for the listen address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let mut last_error = None;

        for address in self.web.bind_addresses() {
            match TcpListener::bind(&address).await {
                Ok(listener) => return Ok(listener),
                Err(e) => {
                    debug!(address = %address, error = %e, "Could not bind");
                    last_error = Some(e);
                }
            }
        }

        Err(ExporterError::Listen {
            address: self.web.listen_address.clone(),
            source: last_error.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no address to bind")
            }),
        })
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.web.listen_address.clone());
        info!(address = %address, path = %self.web.telemetry_path, "Listening on address");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

pub fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>Olric Exporter</title></head>\n\
         <body>\n\
         <h1>Olric Exporter</h1>\n\
         <p><a href='{}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        telemetry_path
    )
}

async fn landing(State(state): State<Arc<ExporterState>>) -> Html<String> {
    Html(state.landing_page.clone())
}

async fn metrics(State(state): State<Arc<ExporterState>>) -> Response {
    // Collectors dial the node synchronously; keep that off the async workers.
    let registry = state.registry.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&registry.gather())
            .map(|body| (encoder.format_type().to_string(), body))
    })
    .await;

    match encoded {
        Ok(Ok((content_type, body))) => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "Metrics collection task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
