//! Reclaim local ports held by stale dev servers and Firebase emulators.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::FirebaseConfig;
use crate::error::{FbopsError, Result};
use crate::runner::{CliCommand, CommandRunner};

/// Dev-server ports always checked, whether or not `firebase.json` exists.
pub const APP_PORTS: [u16; 2] = [3000, 3001];

/// Pause after a kill so the OS can release the socket.
pub const RELEASE_PAUSE: Duration = Duration::from_secs(1);

/// Ports to check, deduplicated and ascending.
pub fn candidate_ports(config: Option<&FirebaseConfig>) -> Vec<u16> {
    let mut ports = APP_PORTS.to_vec();
    if let Some(config) = config {
        ports.extend(config.emulator_ports());
    }
    ports.sort_unstable();
    ports.dedup();
    ports
}

/// Read `config_path` leniently: a missing file is fine, an unreadable or
/// malformed one is logged and ignored.
pub fn ports_to_check(config_path: &Path) -> Vec<u16> {
    match FirebaseConfig::load(config_path) {
        Ok(config) => candidate_ports(config.as_ref()),
        Err(e) => {
            tracing::warn!(
                "Failed to read {} for emulator ports: {e}",
                config_path.display()
            );
            candidate_ports(None)
        }
    }
}

pub fn lsof_command(port: u16) -> CliCommand {
    CliCommand::new("lsof").args([format!("-i:{port}"), "-t".to_string()])
}

pub fn kill_command(pids: &[String]) -> CliCommand {
    CliCommand::new("kill").arg("-9").args(pids.iter().cloned())
}

/// Pids listening on `port`. `lsof` exits 1 when nothing matches, so any
/// failure reads as "port is free".
pub fn occupying_pids(runner: &dyn CommandRunner, port: u16) -> Vec<String> {
    match runner.capture(&lsof_command(port)) {
        Ok(out) => out
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        Err(e) => {
            tracing::debug!(port, "lsof reported no process: {e}");
            Vec::new()
        }
    }
}

/// Kill whatever occupies each port in `ports`, in order.
///
/// A failed kill does not stop the sweep; all failures are reported together
/// once every port has been attempted. Returns the ports that were cleaned.
pub fn reclaim(
    runner: &dyn CommandRunner,
    clock: &dyn Clock,
    ports: &[u16],
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<Vec<u16>> {
    writeln!(out, "Checking for processes to kill on relevant ports...")?;

    let mut cleaned = Vec::new();
    let mut failures = Vec::new();

    for &port in ports {
        let pids = occupying_pids(runner, port);
        if pids.is_empty() {
            continue;
        }

        writeln!(out, "Port {port} is in use. Attempting to kill process...")?;
        let cmd = kill_command(&pids);
        if dry_run {
            writeln!(out, "[DRY RUN] {cmd}")?;
            cleaned.push(port);
            continue;
        }

        match runner.capture(&cmd) {
            Ok(_) => {
                writeln!(out, "Successfully killed process on port {port}")?;
                cleaned.push(port);
                clock.sleep(RELEASE_PAUSE);
            }
            Err(e) => {
                tracing::warn!(port, "Failed to kill process: {e}");
                failures.push(format!("Port {port}: {e}"));
            }
        }
    }

    if cleaned.is_empty() {
        writeln!(out, "No occupied ports found.")?;
    } else {
        let list: Vec<String> = cleaned.iter().map(u16::to_string).collect();
        let label = if dry_run {
            "Would clean up ports"
        } else {
            "Cleaned up ports"
        };
        writeln!(out, "{label}: {}", list.join(", "))?;
    }

    if !failures.is_empty() {
        return Err(FbopsError::PortCleanup(failures));
    }
    Ok(cleaned)
}
