pub mod client;
pub mod daemon_path;
pub mod process;
pub mod report;

use std::{env, path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::DaemonClient;
use daemon_path::to_daemon_path;
use process::{kill_previous_servers, restart_server};
use report::{print_classification, print_report, DataSource};
use tracing::level_filters::LevelFilter;

use crate::{
    classifier::Bucket,
    daemon::{
        args::{TrackingOptions, DEFAULT_PORT},
        start_daemon,
    },
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "sitetime", version, long_about = None)]
#[command(about = "Tracks how much time you spend on each website", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[command(flatten)]
        options: TrackingOptions,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for debugging and for the browser extension during development"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[command(flatten)]
        options: TrackingOptions,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Show time spent per site")]
    Report {
        #[command(flatten)]
        source: DataSource,
    },
    #[command(about = "Split tracked sites into work and play")]
    Classify {
        #[arg(long = "default-bucket", value_enum, default_value_t = Bucket::Play)]
        default_bucket: Bucket,
        #[command(flatten)]
        source: DataSource,
    },
    #[command(about = "Remove all tracked data")]
    Reset {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Init { dir, options } => {
            let daemon = to_daemon_path(env::current_exe()?);
            restart_server(&daemon, dir.as_deref(), &options)?;
            let health = DaemonClient::new(options.port)?
                .wait_until_healthy(STARTUP_TIMEOUT)
                .await?;
            println!(
                "Daemon is running on port {} (status {})",
                options.port, health.status
            );
            Ok(())
        }
        Commands::Serve { dir, options } => {
            let dir = dir.map_or_else(create_application_default_path, Ok)?;
            start_daemon(options.settings(&dir)).await
        }
        Commands::Stop {} => {
            let stopped = kill_previous_servers(&to_daemon_path(env::current_exe()?))?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Report { source } => print_report(&source).await,
        Commands::Classify {
            default_bucket,
            source,
        } => print_classification(&source, default_bucket).await,
        Commands::Reset { port } => {
            DaemonClient::new(port)?.reset().await?;
            println!("Removed all tracked data");
            Ok(())
        }
    }
}
