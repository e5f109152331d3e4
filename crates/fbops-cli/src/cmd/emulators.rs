use crate::output::print_json;
use anyhow::Context;
use fbops_core::emulators;

pub fn run(hub: &str) -> anyhow::Result<()> {
    println!("Querying Emulator Hub at: {}", emulators::hub_url(hub));

    let listing = emulators::fetch_emulators(hub).context("failed to fetch emulator info")?;
    println!("--- Emulator Hub Response ---");
    print_json(&listing)?;
    println!("-----------------------------");
    Ok(())
}
