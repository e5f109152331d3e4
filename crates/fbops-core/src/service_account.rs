//! Service-account existence probe and creation.

use std::io::Write;

use crate::error::Result;
use crate::project::account_id;
use crate::runner::{CliCommand, CommandRunner};

pub const DEFAULT_DISPLAY_NAME: &str = "Cloud Build Service Account";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyExists,
    Created,
    WouldCreate,
}

pub fn describe_command(project_id: &str, email: &str) -> CliCommand {
    CliCommand::new("gcloud").args([
        "iam".to_string(),
        "service-accounts".to_string(),
        "describe".to_string(),
        email.to_string(),
        format!("--project={project_id}"),
        "--quiet".to_string(),
    ])
}

/// `gcloud iam service-accounts create` takes the account id, not the email.
pub fn create_command(project_id: &str, account: &str, display_name: &str) -> CliCommand {
    CliCommand::new("gcloud").args([
        "iam".to_string(),
        "service-accounts".to_string(),
        "create".to_string(),
        account_id(account).to_string(),
        format!("--display-name={display_name}"),
        format!("--project={project_id}"),
        "--quiet".to_string(),
    ])
}

/// Any describe failure, transient or not, reads as "does not exist".
pub fn exists(runner: &dyn CommandRunner, project_id: &str, email: &str) -> bool {
    runner.probe(&describe_command(project_id, email))
}

/// Create the service account `email` unless it already exists.
pub fn ensure(
    runner: &dyn CommandRunner,
    project_id: &str,
    email: &str,
    display_name: &str,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<EnsureOutcome> {
    if exists(runner, project_id, email) {
        writeln!(out, "Service account {email} already exists.")?;
        return Ok(EnsureOutcome::AlreadyExists);
    }

    writeln!(out, "Creating service account...")?;
    let cmd = create_command(project_id, email, display_name);
    if dry_run {
        writeln!(out, "[DRY RUN] {cmd}")?;
        return Ok(EnsureOutcome::WouldCreate);
    }

    writeln!(out, "Executing: {cmd}")?;
    out.flush()?;
    runner.run(&cmd)?;
    Ok(EnsureOutcome::Created)
}
