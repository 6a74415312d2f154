use crate::config::{ExporterConfig, ProbeCommand};
use crate::{ExporterError, Result};
use redis::aio::MultiplexedConnection;
use redis::{RedisResult, Value};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// A single reachability check against one node.
pub trait Probe: Send + Sync {
    fn address(&self) -> &str;

    /// Fails with [`ExporterError::Connection`] when the node cannot be
    /// dialed and [`ExporterError::Query`] when it rejects the query.
    fn check(&self) -> Result<()>;
}

/// Olric speaks RESP, so the connection handling is the redis client's.
///
/// The dial (including the client's own setup round-trip) and the query are
/// each bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct OlricClient {
    address: String,
    timeout: Duration,
    command: ProbeCommand,
}

impl OlricClient {
    pub fn new(config: &ExporterConfig) -> Self {
        Self {
            address: config.address.clone(),
            timeout: config.timeout,
            command: config.probe,
        }
    }

    pub fn url(&self) -> String {
        format!("redis://{}/", self.address)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Dial a fresh connection; nothing is pooled between probes.
    pub async fn connect(&self) -> Result<MultiplexedConnection> {
        debug!(address = %self.address, timeout = ?self.timeout, "Dialing Olric");

        let client =
            redis::Client::open(self.url()).map_err(|e| self.connection_error(e.to_string()))?;

        timeout(self.timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| self.connection_error(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| self.connection_error(e.to_string()))
    }

    /// Any non-error reply counts as success; the stats payload is not decoded.
    pub async fn query(&self, connection: &mut MultiplexedConnection) -> Result<()> {
        let cmd = redis::cmd(self.command.as_str());

        let reply: RedisResult<Value> = timeout(self.timeout, cmd.query_async(connection))
            .await
            .map_err(|_| self.query_error(format!("timed out after {:?}", self.timeout)))?;
        let reply = reply.map_err(|e| self.query_error(e.to_string()))?;

        debug!(address = %self.address, command = %self.command, ?reply, "Olric answered");
        Ok(())
    }

    pub async fn probe(&self) -> Result<()> {
        let mut connection = self.connect().await?;
        self.query(&mut connection).await
    }

    fn connection_error(&self, reason: String) -> ExporterError {
        ExporterError::Connection {
            address: self.address.clone(),
            reason,
        }
    }

    fn query_error(&self, reason: String) -> ExporterError {
        ExporterError::Query {
            address: self.address.clone(),
            command: self.command.to_string(),
            reason,
        }
    }
}

impl Probe for OlricClient {
    fn address(&self) -> &str {
        &self.address
    }

    /// Blocks the calling thread; async callers use [`OlricClient::probe`].
    /// Collectors run on the blocking pool, so a throwaway current-thread
    /// runtime drives the probe there.
    fn check(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.probe())
    }
}
