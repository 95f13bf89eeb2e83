use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    daemon::api::{HealthResponse, StatusResponse},
    tracker::Snapshot,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Talks to a daemon running on this machine.
pub struct DaemonClient {
    client: Client,
    base_url: Url,
}

impl DaemonClient {
    pub fn new(port: u16) -> Result<Self> {
        Self::with_base_url(Url::parse(&format!("http://127.0.0.1:{port}/"))?)
    }

    pub fn with_base_url(base_url: Url) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.client.get(self.base_url.join("health")?).send().await?;
        read_json(response).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        let response = self
            .client
            .get(self.base_url.join("snapshot")?)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn reset(&self) -> Result<()> {
        let response = self.client.post(self.base_url.join("reset")?).send().await?;
        let status: StatusResponse = read_json(response).await?;
        if !status.success {
            bail!(
                "Daemon refused to reset: {}",
                status.error.unwrap_or_default()
            );
        }
        Ok(())
    }

    /// Polls `/health` until the daemon answers or `timeout` runs out.
    pub async fn wait_until_healthy(&self, timeout: Duration) -> Result<HealthResponse> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.health().await {
                Ok(health) => return Ok(health),
                Err(e) if tokio::time::Instant::now() >= deadline => {
                    return Err(e.context(format!("Daemon didn't start in {timeout:?}")))
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error = response
            .json::<StatusResponse>()
            .await
            .ok()
            .and_then(|v| v.error)
            .unwrap_or_default();
        return Err(anyhow!("Daemon answered {status} {error}"));
    }
    Ok(response.json().await?)
}
