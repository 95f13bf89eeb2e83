use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser};
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::{
    classifier::Bucket,
    tracker::TrackerConfig,
    utils::dir::TOTALS_FILE,
};

use super::persistence::retry::RetryPolicy;

pub const DEFAULT_PORT: u16 = 3737;

#[derive(Parser, Debug)]
#[command(name = "sitetime-daemon", version, about = "Tracks time spent per website")]
pub struct DaemonArgs {
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[command(flatten)]
    pub tracking: TrackingOptions,
}

/// Options shared by `sitetime-daemon`, `sitetime serve` and `sitetime init`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct TrackingOptions {
    #[arg(long, default_value_t = DEFAULT_PORT, help = "Port of the HTTP interface on localhost")]
    pub port: u16,
    #[arg(
        long = "min-elapsed",
        default_value_t = 5,
        help = "Seconds a site has to stay active before its time counts"
    )]
    pub min_elapsed_secs: u32,
    #[arg(
        long = "tick-interval",
        default_value_t = 30,
        help = "Seconds between checkpoints of the active site"
    )]
    pub tick_interval_secs: u32,
    #[arg(
        long,
        help = "Keep totals in a remote store speaking the /data protocol instead of a local file"
    )]
    pub remote: Option<Url>,
    #[arg(long = "max-attempts", default_value_t = 5, help = "Attempts per save before giving up")]
    pub max_attempts: u32,
    #[arg(
        long = "default-bucket",
        value_enum,
        default_value_t = Bucket::Play,
        help = "Bucket of sites that match no keyword"
    )]
    pub default_bucket: Bucket,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            min_elapsed_secs: 5,
            tick_interval_secs: 30,
            remote: None,
            max_attempts: 5,
            default_bucket: Bucket::Play,
        }
    }
}

/// Everything the daemon needs to start, resolved from [TrackingOptions].
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub listen: SocketAddr,
    pub data_file: PathBuf,
    pub remote: Option<Url>,
    pub tracker: TrackerConfig,
    pub tick_interval: Duration,
    pub retry: RetryPolicy,
    pub default_bucket: Bucket,
}

impl TrackingOptions {
    pub fn settings(&self, app_dir: &Path) -> DaemonSettings {
        DaemonSettings {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, self.port)),
            data_file: app_dir.join(TOTALS_FILE),
            remote: self.remote.clone(),
            tracker: TrackerConfig {
                min_elapsed: chrono::Duration::seconds(self.min_elapsed_secs.into()),
            },
            // Zero would turn checkpoints into a busy loop.
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1).into()),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                ..RetryPolicy::default()
            },
            default_bucket: self.default_bucket,
        }
    }

    /// Turns options back into command line arguments, used for spawning the daemon.
    pub fn to_command_args(&self) -> Vec<String> {
        let mut args = vec![
            "--port".to_string(),
            self.port.to_string(),
            "--min-elapsed".into(),
            self.min_elapsed_secs.to_string(),
            "--tick-interval".into(),
            self.tick_interval_secs.to_string(),
            "--max-attempts".into(),
            self.max_attempts.to_string(),
            "--default-bucket".into(),
            self.default_bucket.to_string(),
        ];
        if let Some(remote) = &self.remote {
            args.push("--remote".into());
            args.push(remote.to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use crate::classifier::Bucket;

    use super::{DaemonArgs, TrackingOptions};

    #[test]
    fn defaults() {
        let args = DaemonArgs::parse_from(["sitetime-daemon"]);
        assert!(!args.force);
        assert_eq!(args.tracking, TrackingOptions::default());

        let settings = args.tracking.settings(Path::new("/tmp/sitetime"));
        assert_eq!(settings.listen.to_string(), "127.0.0.1:3737");
        assert_eq!(settings.data_file, Path::new("/tmp/sitetime/totals.json"));
        assert_eq!(settings.tracker.min_elapsed, chrono::Duration::seconds(5));
        assert_eq!(settings.retry.max_attempts, 5);
    }

    #[test]
    fn command_args_parse_back() {
        let options = TrackingOptions {
            port: 4000,
            min_elapsed_secs: 2,
            tick_interval_secs: 10,
            remote: Some("http://localhost:9000/".parse().unwrap()),
            max_attempts: 3,
            default_bucket: Bucket::Work,
        };

        let args = DaemonArgs::parse_from(
            ["sitetime-daemon".to_string(), "--force".to_string()]
                .into_iter()
                .chain(options.to_command_args()),
        );

        assert!(args.force);
        assert_eq!(args.tracking, options);
    }
}
