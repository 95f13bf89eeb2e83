use anyhow::Result;
use persistence::PersistenceModule;
use server::AppState;
use storage::{file_gateway::FileGateway, http_gateway::HttpGateway, load_or_default, Gateway};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracking::{TrackerCommand, TrackerHandle, TrackerModule};

use crate::{
    classifier::Classifier,
    tracker::{totals::Totals, ActivityTracker},
    utils::clock::{Clock, DefaultClock},
};
use args::DaemonSettings;

pub mod api;
pub mod args;
pub mod persistence;
pub mod server;
pub mod shutdown;
pub mod storage;
pub mod tracking;

/// Represents the starting point for the daemon
pub async fn start_daemon(settings: DaemonSettings) -> Result<()> {
    let gateway = create_gateway(&settings)?;
    let listener = TcpListener::bind(settings.listen)
        .await
        .inspect_err(|e| error!("Can't listen on {} {e:?}", settings.listen))?;

    let shutdown_token = CancellationToken::new();

    let (_, result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_modules(&settings, gateway, listener, shutdown_token.clone(), DefaultClock),
    );

    result.map(|totals| info!("Daemon stopped with totals for {} sites", totals.len()))
}

fn create_gateway(settings: &DaemonSettings) -> Result<Gateway> {
    match &settings.remote {
        Some(url) => {
            info!("Keeping totals in {url}");
            Ok(Gateway::Http(HttpGateway::new(url)?))
        }
        None => {
            let gateway = FileGateway::new(settings.data_file.clone())?;
            info!("Keeping totals in {}", gateway.path().display());
            Ok(Gateway::File(gateway))
        }
    }
}

/// Runs tracking, persistence and the HTTP server until `shutdown_token` is cancelled. Returns
/// totals at the moment of shutdown, after they were handed to persistence.
async fn run_modules(
    settings: &DaemonSettings,
    gateway: Gateway,
    listener: TcpListener,
    shutdown_token: CancellationToken,
    clock: impl Clock + Clone,
) -> Result<Totals> {
    let initial = load_or_default(&gateway).await;

    let (handle, commands) = TrackerHandle::channel();
    let (save_sender, save_receiver) = watch::channel(initial.clone());

    let tracker = create_tracker(
        settings,
        initial,
        save_sender,
        commands,
        &shutdown_token,
        clock.clone(),
    );
    let persistence = create_persistence(settings, save_receiver, gateway, clock);
    let app = server::router(AppState::new(
        handle,
        Classifier::new(settings.default_bucket),
    ));

    let (server_result, tracker_result, _) = tokio::join!(
        async {
            let result = server::serve(listener, app, shutdown_token.clone()).await;
            // Without the server nothing can reach the tracker anymore.
            shutdown_token.cancel();
            result
        },
        tracker.run(),
        persistence.run(),
    );

    if let Err(server_result) = server_result {
        error!("Server got an error {:?}", server_result);
    }

    tracker_result.inspect_err(|e| error!("Tracker module got an error {e:?}"))
}

fn create_tracker(
    settings: &DaemonSettings,
    initial: Totals,
    save_sender: watch::Sender<Totals>,
    commands: mpsc::Receiver<TrackerCommand>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> TrackerModule<watch::Sender<Totals>> {
    TrackerModule::new(
        ActivityTracker::new(initial, save_sender, settings.tracker),
        commands,
        shutdown_token.clone(),
        settings.tick_interval,
        Box::new(clock),
    )
}

fn create_persistence(
    settings: &DaemonSettings,
    save_receiver: watch::Receiver<Totals>,
    gateway: Gateway,
    clock: impl Clock,
) -> PersistenceModule<Gateway> {
    PersistenceModule::new(save_receiver, gateway, settings.retry, Box::new(clock))
}

#[cfg(test)]
mod daemon_tests {
    use std::{fs, time::Duration};

    use anyhow::Result;
    use reqwest::Client;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            args::TrackingOptions,
            create_gateway, run_modules,
            storage::{file_gateway::FileGateway, PersistenceGateway},
        },
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    /// Very simple smoke test to check that the daemon is wired properly: events sent over HTTP
    /// end up in the data file once the daemon shuts down.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        fs::write(dir.path().join("totals.json"), r#"{ "reddit.com": 3 }"#)?;

        let options = TrackingOptions {
            min_elapsed_secs: 0,
            ..TrackingOptions::default()
        };
        let settings = options.settings(dir.path());
        let gateway = create_gateway(&settings)?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = format!("http://{}", listener.local_addr()?);
        let shutdown_token = CancellationToken::new();

        let (result, _) = tokio::join!(
            run_modules(&settings, gateway, listener, shutdown_token.clone(), DefaultClock),
            async {
                let client = Client::new();
                client
                    .post(format!("{address}/events"))
                    .json(&json!({ "type": "activate", "url": "https://github.com" }))
                    .send()
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
                shutdown_token.cancel();
            },
        );

        let totals = result?;
        assert!(totals.minutes("github.com") > 0.);

        let stored = FileGateway::new(dir.path().join("totals.json"))?.load().await?;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.minutes("reddit.com"), 3.);
        assert!((stored.minutes("github.com") - totals.minutes("github.com")).abs() < 1e-9);

        Ok(())
    }

    #[tokio::test]
    async fn server_shutdown_stops_daemon_without_events() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let settings = TrackingOptions::default().settings(dir.path());
        let gateway = create_gateway(&settings)?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let shutdown_token = CancellationToken::new();
        shutdown_token.cancel();

        let totals = run_modules(&settings, gateway, listener, shutdown_token, DefaultClock).await?;

        assert!(totals.is_empty());
        // Nothing changed, so nothing was written.
        assert!(!dir.path().join("totals.json").exists());
        Ok(())
    }
}
