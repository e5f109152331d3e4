use anyhow::Context;
use fbops_core::app_hosting::{self, BackendRef, HttpRolloutApi};
use fbops_core::clock::SystemClock;
use fbops_core::rollout::{self, VerifyOptions};
use fbops_core::runner::SystemRunner;

pub fn run(
    project: String,
    location: String,
    backend: String,
    timeout_secs: u64,
    endpoint: &str,
) -> anyhow::Result<()> {
    let backend = BackendRef {
        project,
        location,
        backend,
    };

    let token = app_hosting::access_token(&SystemRunner)
        .context("failed to obtain an access token (set GOOGLE_OAUTH_ACCESS_TOKEN or run 'gcloud auth login')")?;
    let api = HttpRolloutApi::new(endpoint, token)?;

    let mut stdout = std::io::stdout().lock();
    rollout::verify(
        &api,
        &SystemClock,
        &backend,
        &VerifyOptions::with_timeout_secs(timeout_secs),
        &mut stdout,
    )?;
    Ok(())
}
