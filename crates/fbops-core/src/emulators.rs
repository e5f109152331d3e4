//! Query the local Firebase Emulator Hub for running emulators.

use serde_json::Value;

use crate::error::Result;

pub const HUB_ENV: &str = "FIREBASE_EMULATOR_HUB";
pub const DEFAULT_HUB: &str = "localhost:4400";

/// `host:port` or a full base URL.
pub fn hub_url(hub: &str) -> String {
    let hub = hub.trim_end_matches('/');
    if hub.starts_with("http://") || hub.starts_with("https://") {
        format!("{hub}/emulators")
    } else {
        format!("http://{hub}/emulators")
    }
}

/// Fetch the hub's `/emulators` listing as raw JSON.
pub fn fetch_emulators(hub: &str) -> Result<Value> {
    let url = hub_url(hub);
    tracing::debug!(%url, "querying emulator hub");
    let resp = reqwest::blocking::get(&url)?.error_for_status()?;
    Ok(resp.json()?)
}
