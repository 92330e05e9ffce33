//! Network health probes.
//!
//! `HttpProbe` issues a GET and treats any 2xx as healthy; other status
//! codes are a clean "unhealthy". Connection failures and timeouts are
//! errors, which the orchestrator counts as unhealthy too but logs with
//! the cause.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use tracing::debug;

use revive_core::ProbeConfig;
use revive_orchestrator::{HealthCheck, SharedHealthCheck};

/// HTTP GET probe against `http://{address}{path}`.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    pub address: String,
    pub path: String,
    pub timeout: Duration,
}

impl HttpProbe {
    pub fn new(address: impl Into<String>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            path: path.into(),
            timeout,
        }
    }

    async fn request(&self, uri: &str) -> anyhow::Result<bool> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("connecting to {}", self.address))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .context("http handshake")?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(uri)
            .header("host", &self.address)
            .header("user-agent", "revive-probe/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())?;

        let resp = sender.send_request(req).await.context("sending probe request")?;
        if resp.status().is_success() {
            Ok(true)
        } else {
            debug!(status = %resp.status(), %uri, "health probe non-2xx");
            Ok(false)
        }
    }
}

#[async_trait]
impl HealthCheck for HttpProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        let uri = format!("http://{}{}", self.address, self.path);
        match tokio::time::timeout(self.timeout, self.request(&uri)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("health probe {uri} timed out after {:?}", self.timeout)),
        }
    }
}

/// Healthy when a TCP connection to `address` can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub address: String,
    pub timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

#[async_trait]
impl HealthCheck for TcpProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        let connect = tokio::net::TcpStream::connect(&self.address);
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e).with_context(|| format!("connecting to {}", self.address)),
            Err(_) => Err(anyhow!(
                "tcp probe {} timed out after {:?}",
                self.address,
                self.timeout
            )),
        }
    }
}

/// Build the health check a config entry describes.
pub fn from_config(config: &ProbeConfig) -> SharedHealthCheck {
    match config {
        ProbeConfig::Http {
            address,
            path,
            timeout,
        } => Arc::new(HttpProbe::new(address, path, *timeout)),
        ProbeConfig::Tcp { address, timeout } => Arc::new(TcpProbe::new(address, *timeout)),
    }
}
