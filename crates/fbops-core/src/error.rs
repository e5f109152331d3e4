use thiserror::Error;

#[derive(Debug, Error)]
pub enum FbopsError {
    #[error("could not determine active project: {0}")]
    ActiveProject(String),

    #[error("could not determine project number for '{project}': {reason}")]
    ProjectNumber { project: String, reason: String },

    #[error("No rollouts found.")]
    NoRolloutsFound,

    #[error("Rollout failed with status: {state}{}", detail_suffix(.detail))]
    RolloutFailed {
        state: String,
        detail: Option<String>,
    },

    #[error("Timeout waiting for rollout completion after {0} seconds.")]
    RolloutTimeout(u64),

    #[error("command failed ({status}): {command}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("package directory not found: {0}")]
    PackageNotFound(String),

    #[error("no .tgz file found for {package} in {dir}")]
    PackedArchiveMissing { package: String, dir: String },

    #[error("encountered errors while killing ports:\n{}", .0.join("\n"))]
    PortCleanup(Vec<String>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!("\nError details: {d}"),
        None => String::new(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

pub type Result<T> = std::result::Result<T, FbopsError>;
