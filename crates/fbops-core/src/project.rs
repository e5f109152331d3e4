//! Active project and principal resolution.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{FbopsError, Result};
use crate::runner::{CliCommand, CommandRunner};

pub const SERVICE_ACCOUNT_DOMAIN: &str = "iam.gserviceaccount.com";

static PAREN_RE: OnceLock<Regex> = OnceLock::new();

fn paren_re() -> &'static Regex {
    PAREN_RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").unwrap())
}

/// Extract the project id from `firebase use` output.
///
/// `"Active Project: staging (my-project-id)"` yields `my-project-id`.
/// Output without a parenthesized suffix is returned trimmed. Returns `None`
/// only when nothing usable remains.
pub fn parse_project_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let id = match paren_re().captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => raw.to_string(),
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Command that prints the active firebase project.
///
/// Prefers a `firebase` binary on PATH, falling back to `npx firebase`.
pub fn firebase_use_command() -> CliCommand {
    if which::which("firebase").is_ok() {
        CliCommand::new("firebase").arg("use")
    } else {
        CliCommand::new("npx").args(["firebase", "use"])
    }
}

/// Resolve the active project id via `firebase use`.
pub fn resolve_active_project(runner: &dyn CommandRunner) -> Result<String> {
    resolve_active_project_with(runner, &firebase_use_command())
}

pub fn resolve_active_project_with(
    runner: &dyn CommandRunner,
    cmd: &CliCommand,
) -> Result<String> {
    let raw = runner.capture(cmd).map_err(|e| {
        FbopsError::ActiveProject(format!(
            "{e}\nMake sure you have the firebase CLI installed and are in a firebase project directory."
        ))
    })?;
    parse_project_id(&raw).ok_or_else(|| {
        FbopsError::ActiveProject(format!("no project id in output: \"{}\"", raw.trim()))
    })
}

/// Expand a bare service-account name to its full email.
///
/// `builder` in project `proj` becomes `builder@proj.iam.gserviceaccount.com`.
/// Anything already containing `@` is returned unchanged.
pub fn expand_service_account_email(account: &str, project_id: &str) -> String {
    if account.contains('@') {
        account.to_string()
    } else {
        format!("{account}@{project_id}.{SERVICE_ACCOUNT_DOMAIN}")
    }
}

/// The account id (local part) of a service-account name or email.
pub fn account_id(account: &str) -> &str {
    account.split('@').next().unwrap_or(account)
}

/// Look up the numeric project number with `gcloud projects describe`.
pub fn resolve_project_number(runner: &dyn CommandRunner, project_id: &str) -> Result<String> {
    let cmd = CliCommand::new("gcloud").args([
        "projects",
        "describe",
        project_id,
        "--format=value(projectNumber)",
    ]);
    let out = runner
        .capture(&cmd)
        .map_err(|e| FbopsError::ProjectNumber {
            project: project_id.to_string(),
            reason: e.to_string(),
        })?;
    let number = out.trim();
    if number.is_empty() {
        return Err(FbopsError::ProjectNumber {
            project: project_id.to_string(),
            reason: "empty output from gcloud".to_string(),
        });
    }
    Ok(number.to_string())
}

/// Email of the default compute service account for a project number.
pub fn default_compute_email(project_number: &str) -> String {
    format!("{project_number}-compute@developer.gserviceaccount.com")
}
