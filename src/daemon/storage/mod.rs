//! Durable storage of [Totals]. The tracker itself never talks to storage, it only requests a
//! save; [PersistenceGateway] implementations are driven by
//! [PersistenceModule](crate::daemon::persistence::PersistenceModule).
//!  - [file_gateway::FileGateway] keeps a JSON file on the local disk.
//!  - [http_gateway::HttpGateway] sends totals to the `/data` endpoint of a remote store.

pub mod file_gateway;
pub mod http_gateway;

use std::{future::Future, ops::Deref, path::PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::tracker::totals::Totals;

use self::{file_gateway::FileGateway, http_gateway::HttpGateway};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to access totals file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Totals from {origin} are malformed")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Persistence endpoint {url} is unreachable")]
    TransportUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Persistence endpoint {url} rejected the request: {reason}")]
    Rejected { url: String, reason: String },
}

impl PersistenceError {
    /// Malformed data stays malformed no matter how many times we retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PersistenceError::Malformed { .. })
    }
}

/// Interface for abstracting storage of totals.
pub trait PersistenceGateway {
    /// Reads stored totals. Missing data is not an error and results in empty totals.
    fn load(&self) -> impl Future<Output = Result<Totals, PersistenceError>> + Send;

    /// Replaces stored totals.
    fn save(&self, totals: &Totals) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

impl<T: Deref + Sync> PersistenceGateway for T
where
    T::Target: PersistenceGateway + Sync,
{
    fn load(&self) -> impl Future<Output = Result<Totals, PersistenceError>> + Send {
        self.deref().load()
    }

    fn save(&self, totals: &Totals) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        self.deref().save(totals)
    }
}

/// Gateway picked from daemon options.
pub enum Gateway {
    File(FileGateway),
    Http(HttpGateway),
}

impl PersistenceGateway for Gateway {
    async fn load(&self) -> Result<Totals, PersistenceError> {
        match self {
            Gateway::File(gateway) => gateway.load().await,
            Gateway::Http(gateway) => gateway.load().await,
        }
    }

    async fn save(&self, totals: &Totals) -> Result<(), PersistenceError> {
        match self {
            Gateway::File(gateway) => gateway.save(totals).await,
            Gateway::Http(gateway) => gateway.save(totals).await,
        }
    }
}

/// Loads totals on startup. Failures are logged and tracking starts from empty totals.
pub async fn load_or_default(gateway: &impl PersistenceGateway) -> Totals {
    match gateway.load().await {
        Ok(totals) => {
            info!("Loaded totals for {} sites", totals.len());
            totals
        }
        Err(e) => {
            error!("Failed to load totals, starting with empty data {e:?}");
            Totals::new()
        }
    }
}
