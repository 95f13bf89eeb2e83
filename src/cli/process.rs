use std::{
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{anyhow, bail, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use crate::daemon::args::TrackingOptions;

/// Stops every process running the executable at `name`, except this one. Daemons get a chance
/// to flush their data on SIGTERM. Returns how many processes were stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get own pid: {e}"))?;

    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops running daemons and starts a new one. The daemon binary detaches itself, so this only
/// waits for the launcher to exit.
pub fn restart_server(daemon: &Path, dir: Option<&Path>, options: &TrackingOptions) -> Result<()> {
    kill_previous_servers(daemon)?;

    let mut command = Command::new(daemon);
    if let Some(dir) = dir {
        command.arg("--dir").arg(std::path::absolute(dir)?);
    }
    command.args(options.to_command_args());
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    info!("Spawning {daemon:?}");
    let status = command
        .status()
        .map_err(|e| anyhow!("Can't start {daemon:?}: {e}"))?;
    if !status.success() {
        bail!("Daemon launcher exited with {status}");
    }
    Ok(())
}
