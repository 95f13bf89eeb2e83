use std::{fmt::Write, path::PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::warn;

use crate::{
    classifier::{Breakdown, Bucket, Classifier},
    daemon::{
        args::DEFAULT_PORT,
        storage::{file_gateway::FileGateway, PersistenceGateway},
    },
    tracker::Snapshot,
    utils::{
        dir::{create_application_default_path, TOTALS_FILE},
        percentage::minutes_percentage,
        time::format_minutes,
    },
};

use super::client::DaemonClient;

/// Where the cli reads tracked data from. The running daemon is asked first, stored totals are
/// used when it is unreachable.
#[derive(Args, Debug)]
pub struct DataSource {
    #[arg(long, default_value_t = DEFAULT_PORT, help = "Port of the running daemon")]
    pub port: u16,
    #[arg(long, help = "Application directory used when the daemon is not running")]
    pub dir: Option<PathBuf>,
}

impl DataSource {
    pub async fn load_snapshot(&self) -> Result<Snapshot> {
        match DaemonClient::new(self.port)?.snapshot().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!("Daemon is unreachable, reading stored totals {e:?}");
                let dir = self
                    .dir
                    .clone()
                    .map_or_else(create_application_default_path, Ok)?;
                let totals = FileGateway::new(dir.join(TOTALS_FILE))?.load().await?;
                Ok(Snapshot::from_totals(totals))
            }
        }
    }
}

pub async fn print_report(source: &DataSource) -> Result<()> {
    let snapshot = source.load_snapshot().await?;
    print!("{}", render_report(&snapshot));
    Ok(())
}

pub async fn print_classification(source: &DataSource, default_bucket: Bucket) -> Result<()> {
    let snapshot = source.load_snapshot().await?;
    let breakdown = Classifier::new(default_bucket).breakdown(&snapshot.sites);
    print!("{}", render_breakdown(&breakdown));
    Ok(())
}

/// One line per site, most used first: share, time and site separated by tabs.
pub fn render_report(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    match &snapshot.current_site {
        Some(site) if snapshot.is_tracking => {
            let _ = writeln!(out, "Tracking {site}");
        }
        _ => {
            let _ = writeln!(out, "Not tracking");
        }
    }

    if snapshot.sites.is_empty() {
        let _ = writeln!(out, "No data yet");
        return out;
    }

    for (site, minutes) in snapshot.sites.by_time_spent() {
        let _ = writeln!(
            out,
            "{}\t{}\t{}",
            minutes_percentage(minutes, snapshot.total),
            format_minutes(minutes),
            site
        );
    }
    let _ = writeln!(out, "Total\t{}", format_minutes(snapshot.total));
    out
}

pub fn render_breakdown(breakdown: &Breakdown) -> String {
    let mut out = String::new();
    let groups = [
        (
            "Work",
            breakdown.work_percentage,
            breakdown.work_minutes,
            &breakdown.classification.work,
        ),
        (
            "Play",
            breakdown.play_percentage,
            breakdown.play_minutes,
            &breakdown.classification.play,
        ),
    ];
    for (name, percentage, minutes, sites) in groups {
        let _ = writeln!(out, "{name}\t{percentage}\t{}", format_minutes(minutes));
        for site in sites {
            let _ = writeln!(out, "\t{site}");
        }
    }
    out
}
