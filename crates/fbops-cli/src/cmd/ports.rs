use fbops_core::clock::SystemClock;
use fbops_core::ports;
use fbops_core::runner::SystemRunner;
use std::path::Path;

pub fn run(config: &Path, dry_run: bool) -> anyhow::Result<()> {
    let candidates = ports::ports_to_check(config);
    tracing::debug!(?candidates, "ports to check");

    let mut stdout = std::io::stdout().lock();
    ports::reclaim(&SystemRunner, &SystemClock, &candidates, dry_run, &mut stdout)?;
    Ok(())
}
