use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    fs::operations::{overwrite_locked, read_locked},
    tracker::totals::Totals,
};

use super::{PersistenceError, PersistenceGateway};

/// Stores totals as a JSON object `{ "site": minutes }` in a single file.
pub struct FileGateway {
    path: PathBuf,
}

/// Some writers dumped a whole snapshot `{ "sites": {...}, "total": ... }` instead of plain
/// totals. Both are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTotals {
    Snapshot { sites: Totals },
    Plain(Totals),
}

impl FileGateway {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Keeps a copy of an unreadable file, so that the next save doesn't destroy it completely.
    async fn back_up_corrupted(&self) {
        let backup = self.path.with_extension("json.corrupted");
        match tokio::fs::copy(&self.path, &backup).await {
            Ok(_) => warn!("Copied unreadable totals into {backup:?}"),
            Err(e) => warn!("Failed to back up unreadable totals {e:?}"),
        }
    }
}

impl PersistenceGateway for FileGateway {
    async fn load(&self) -> Result<Totals, PersistenceError> {
        let Some(content) = read_locked(&self.path)
            .await
            .map_err(|e| self.io_error(e))?
        else {
            info!("No totals stored in {:?} yet", self.path);
            return Ok(Totals::new());
        };

        if content.trim().is_empty() {
            return Ok(Totals::new());
        }

        match serde_json::from_str::<StoredTotals>(&content) {
            Ok(StoredTotals::Snapshot { sites } | StoredTotals::Plain(sites)) => Ok(sites),
            Err(source) => {
                self.back_up_corrupted().await;
                Err(PersistenceError::Malformed {
                    origin: self.path.display().to_string(),
                    source,
                })
            }
        }
    }

    async fn save(&self, totals: &Totals) -> Result<(), PersistenceError> {
        let content =
            serde_json::to_vec_pretty(totals).map_err(|source| PersistenceError::Malformed {
                origin: self.path.display().to_string(),
                source,
            })?;
        overwrite_locked(&self.path, &content)
            .await
            .map_err(|e| self.io_error(e))
    }
}
