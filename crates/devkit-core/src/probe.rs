use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::{DevkitError, Result};

/// Network probes used by the benchmark pass: JSON telemetry endpoints and
/// plain TCP reachability.
#[allow(async_fn_in_trait)]
pub trait Probe {
    async fn get_json(&self, url: &str) -> Result<Value>;

    async fn tcp_reachable(&self, host: &str, port: u16) -> bool;
}

pub struct HttpProbe {
    http: Client,
    connect_timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, timeout))
    }

    pub fn with_client(http: Client, connect_timeout: Duration) -> Self {
        Self {
            http,
            connect_timeout,
        }
    }
}

impl Probe for HttpProbe {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DevkitError::Api { status, body });
        }
        Ok(resp.json().await?)
    }

    async fn tcp_reachable(&self, host: &str, port: u16) -> bool {
        let connect = tokio::net::TcpStream::connect((host, port));
        matches!(
            tokio::time::timeout(self.connect_timeout, connect).await,
            Ok(Ok(_))
        )
    }
}
