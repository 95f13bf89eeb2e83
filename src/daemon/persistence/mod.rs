use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{
    daemon::storage::PersistenceGateway, tracker::totals::Totals, utils::clock::Clock,
};

use retry::{save_with_retry, RetryPolicy};

pub mod retry;

/// Bridges save requests of the tracker and a [PersistenceGateway]. Requests come through a watch
/// channel, so when saving is slower than tracking only the latest totals get written.
pub struct PersistenceModule<G> {
    receiver: watch::Receiver<Totals>,
    gateway: G,
    policy: RetryPolicy,
    clock: Box<dyn Clock>,
}

impl<G: PersistenceGateway> PersistenceModule<G> {
    pub fn new(
        receiver: watch::Receiver<Totals>,
        gateway: G,
        policy: RetryPolicy,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            receiver,
            gateway,
            policy,
            clock,
        }
    }

    /// Saves totals until the sending side is dropped. A value sent right before the drop is
    /// still saved.
    pub async fn run(mut self) {
        while self.receiver.changed().await.is_ok() {
            let totals = self.receiver.borrow_and_update().clone();
            self.save(&totals).await;
        }
        info!("Persistence finished");
    }

    async fn save(&self, totals: &Totals) {
        match save_with_retry(&self.gateway, totals, &self.policy, self.clock.as_ref()).await {
            Ok(()) => debug!("Saved totals for {} sites", totals.len()),
            // Totals stay in memory, the next change carries them forward.
            Err(e) => error!("Failed to save totals {e:?}"),
        }
    }
}
