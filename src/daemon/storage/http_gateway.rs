use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    daemon::api::{DataRequest, DataResponse, StatusResponse},
    tracker::totals::Totals,
};

use super::{PersistenceError, PersistenceGateway};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Keeps totals in a remote store that speaks the `/data` protocol: `GET` returns
/// `{ success, data }`, `POST` takes `{ data }` and answers `{ success, error }`.
pub struct HttpGateway {
    client: Client,
    data_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &Url) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            data_url: data_url(base_url)?,
        })
    }

    pub fn data_url(&self) -> &Url {
        &self.data_url
    }

    fn unavailable(&self, source: reqwest::Error) -> PersistenceError {
        PersistenceError::TransportUnavailable {
            url: self.data_url.to_string(),
            source,
        }
    }

    fn rejected(&self, reason: impl Into<String>) -> PersistenceError {
        PersistenceError::Rejected {
            url: self.data_url.to_string(),
            reason: reason.into(),
        }
    }

    async fn read_body<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PersistenceError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.unavailable(e))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<StatusResponse>(&body)
                .ok()
                .and_then(|v| v.error)
                .unwrap_or(body);
            return Err(self.rejected(format!("{status}: {reason}")));
        }

        serde_json::from_str(&body).map_err(|source| PersistenceError::Malformed {
            origin: self.data_url.to_string(),
            source,
        })
    }
}

/// `{base}/data`. Unlike [Url::join] this keeps the last segment of a base without a trailing
/// slash.
fn data_url(base_url: &Url) -> Result<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("{base_url} can't be used as a base url"))?
        .pop_if_empty()
        .push("data");
    Ok(url)
}

impl PersistenceGateway for HttpGateway {
    async fn load(&self) -> Result<Totals, PersistenceError> {
        let response = self
            .client
            .get(self.data_url.clone())
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let DataResponse {
            success,
            data,
            error,
        } = self.read_body(response).await?;
        if success {
            Ok(data)
        } else {
            Err(self.rejected(error.unwrap_or_default()))
        }
    }

    async fn save(&self, totals: &Totals) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(self.data_url.clone())
            .json(&DataRequest {
                data: totals.clone(),
            })
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let StatusResponse { success, error } = self.read_body(response).await?;
        if success {
            Ok(())
        } else {
            Err(self.rejected(error.unwrap_or_default()))
        }
    }
}
