//! Track the newest App Hosting rollout of a backend to a terminal state.
//!
//! The verifier never mutates the rollout. It lists recent rollouts, picks
//! the newest by `createTime` (the list order is not trusted), then polls
//! its status at a fixed interval until it succeeds, fails, is cancelled,
//! or the timeout budget runs out.
//!
//! A failed list or status request is fatal: there is no retry beyond the
//! poll loop itself.

use std::io::Write;
use std::time::Duration;

use crate::app_hosting::{BackendRef, RolloutApi, RolloutRecord, RolloutState, RolloutStatus};
use crate::clock::Clock;
use crate::error::{FbopsError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub page_size: u32,
}

impl VerifyOptions {
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(secs),
            ..Self::default()
        }
    }
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: POLL_INTERVAL,
            page_size: PAGE_SIZE,
        }
    }
}

/// The most recently created rollout, regardless of input order.
pub fn latest_rollout(mut rollouts: Vec<RolloutRecord>) -> Option<RolloutRecord> {
    rollouts.sort_by(|a, b| b.create_time.cmp(&a.create_time));
    rollouts.into_iter().next()
}

/// Wait for the newest rollout of `backend` to finish.
///
/// Returns the final status on `SUCCEEDED`. `FAILED`/`CANCELLED`, an empty
/// rollout list, and an exhausted budget are all errors.
pub fn verify(
    api: &dyn RolloutApi,
    clock: &dyn Clock,
    backend: &BackendRef,
    opts: &VerifyOptions,
    out: &mut dyn Write,
) -> Result<RolloutStatus> {
    writeln!(
        out,
        "Verifying rollout for {} in {}...",
        backend.backend, backend.project
    )?;

    let rollouts = api.list_rollouts(backend, opts.page_size)?;
    let latest = latest_rollout(rollouts).ok_or(FbopsError::NoRolloutsFound)?;
    writeln!(out, "Tracking rollout: {}", latest.name)?;

    let start = clock.now();
    while clock.now().duration_since(start) < opts.timeout {
        let status = api.get_rollout(&latest.name)?;
        writeln!(out, "Rollout status: {}", status.state)?;

        match &status.state {
            RolloutState::Succeeded => {
                writeln!(out, "Rollout succeeded!")?;
                return Ok(status);
            }
            RolloutState::Failed | RolloutState::Cancelled => {
                let detail = status
                    .error
                    .as_ref()
                    .map(serde_json::to_string_pretty)
                    .transpose()?;
                return Err(FbopsError::RolloutFailed {
                    state: status.state.to_string(),
                    detail,
                });
            }
            _ => {}
        }

        out.flush()?;
        clock.sleep(opts.poll_interval);
    }

    Err(FbopsError::RolloutTimeout(opts.timeout.as_secs()))
}
