use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span};

use crate::{
    tracker::{
        event::TransitionEvent, totals::Totals, ActivityTracker, SaveSink, Snapshot,
    },
    utils::clock::Clock,
};

const COMMAND_BUFFER: usize = 32;

/// Requests accepted by [TrackerModule]. Commands that produce a result carry a channel for the
/// reply.
#[derive(Debug)]
pub enum TrackerCommand {
    Event(TransitionEvent),
    Snapshot(oneshot::Sender<Snapshot>),
    Reset(oneshot::Sender<()>),
    Import(Totals, oneshot::Sender<()>),
}

/// Cheap to clone way of talking to a running [TrackerModule].
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    sender: mpsc::Sender<TrackerCommand>,
}

impl TrackerHandle {
    pub fn channel() -> (Self, mpsc::Receiver<TrackerCommand>) {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        (Self { sender }, receiver)
    }

    pub async fn send_event(&self, event: TransitionEvent) -> Result<()> {
        self.send(TrackerCommand::Event(event)).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, response) = oneshot::channel();
        self.send(TrackerCommand::Snapshot(reply)).await?;
        Ok(response.await?)
    }

    pub async fn reset(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(TrackerCommand::Reset(reply)).await?;
        Ok(response.await?)
    }

    pub async fn import(&self, totals: Totals) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(TrackerCommand::Import(totals, reply)).await?;
        Ok(response.await?)
    }

    async fn send(&self, command: TrackerCommand) -> Result<()> {
        self.sender
            .send(command)
            .await
            .map_err(|_| anyhow!("Tracker is not running"))
    }
}

/// Owns the [ActivityTracker] and serializes every access to it. Besides commands it produces
/// periodic checkpoints, so long sessions are saved while they are still running.
pub struct TrackerModule<S> {
    tracker: ActivityTracker<S>,
    commands: mpsc::Receiver<TrackerCommand>,
    shutdown: CancellationToken,
    tick_interval: Duration,
    clock: Box<dyn Clock>,
}

impl<S: SaveSink> TrackerModule<S> {
    pub fn new(
        tracker: ActivityTracker<S>,
        commands: mpsc::Receiver<TrackerCommand>,
        shutdown: CancellationToken,
        tick_interval: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            tracker,
            commands,
            shutdown,
            tick_interval,
            clock,
        }
    }

    fn handle(&mut self, command: TrackerCommand) {
        let now = self.clock.time();
        match command {
            TrackerCommand::Event(event) => self.tracker.handle_event(event, now),
            TrackerCommand::Snapshot(reply) => {
                if reply.send(self.tracker.snapshot(now)).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            TrackerCommand::Reset(reply) => {
                self.tracker.reset();
                let _ = reply.send(());
            }
            TrackerCommand::Import(totals, reply) => {
                self.tracker.import(totals, now);
                let _ = reply.send(());
            }
        }
    }

    /// Executes the tracker event loop. Returns the final totals once shutdown is requested or
    /// every [TrackerHandle] is dropped. The sink is dropped on return, which lets persistence
    /// write the last state and finish.
    pub async fn run(mut self) -> Result<Totals> {
        let mut checkpoint = self.clock.instant() + self.tick_interval;
        loop {
            // `None` means the checkpoint timer fired.
            let command = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => Some(command),
                    None => break,
                },
                _ = self.clock.sleep_until(checkpoint) => None,
            };

            match command {
                Some(command) => self.handle(command),
                None => {
                    let _span = info_span!("Checkpoint").entered();
                    self.tracker.tick(self.clock.time());
                    checkpoint = self.clock.instant() + self.tick_interval;
                }
            }
        }

        let (totals, _) = self.tracker.finish(self.clock.time());
        info!("Tracker finished with {:.2}min total", totals.total());
        Ok(totals)
    }
}
