//! Firebase App Hosting REST client (rollouts only).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

use crate::error::Result;
use crate::runner::{CliCommand, CommandRunner};

pub const DEFAULT_ENDPOINT: &str = "https://firebaseapphosting.googleapis.com/v1beta";

/// Env var holding a pre-minted OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An App Hosting backend, addressed by project, location and backend id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRef {
    pub project: String,
    pub location: String,
    pub backend: String,
}

impl BackendRef {
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/backends/{}",
            self.project, self.location, self.backend
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutRecord {
    pub name: String,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRolloutsResponse {
    #[serde(default)]
    pub rollouts: Vec<RolloutRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RolloutState {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
    Other(String),
}

impl RolloutState {
    pub fn as_str(&self) -> &str {
        match self {
            RolloutState::Pending => "PENDING",
            RolloutState::Succeeded => "SUCCEEDED",
            RolloutState::Failed => "FAILED",
            RolloutState::Cancelled => "CANCELLED",
            RolloutState::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RolloutState::Succeeded | RolloutState::Failed | RolloutState::Cancelled
        )
    }
}

impl From<String> for RolloutState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => RolloutState::Pending,
            "SUCCEEDED" => RolloutState::Succeeded,
            "FAILED" => RolloutState::Failed,
            "CANCELLED" => RolloutState::Cancelled,
            _ => RolloutState::Other(s),
        }
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RolloutStatus {
    #[serde(default = "unspecified_state")]
    pub state: RolloutState,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

fn unspecified_state() -> RolloutState {
    RolloutState::Other("STATE_UNSPECIFIED".to_string())
}

// ---------------------------------------------------------------------------
// API seam
// ---------------------------------------------------------------------------

/// Read-only view of the rollouts API.
pub trait RolloutApi {
    fn list_rollouts(&self, backend: &BackendRef, page_size: u32) -> Result<Vec<RolloutRecord>>;
    fn get_rollout(&self, name: &str) -> Result<RolloutStatus>;
}

/// Blocking HTTP implementation with a bearer token.
pub struct HttpRolloutApi {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl HttpRolloutApi {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("fbops/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.endpoint, path.trim_start_matches('/'));
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()?
            .error_for_status()?;
        Ok(resp.json()?)
    }
}

impl RolloutApi for HttpRolloutApi {
    fn list_rollouts(&self, backend: &BackendRef, page_size: u32) -> Result<Vec<RolloutRecord>> {
        let path = format!("{}/rollouts", backend.resource_name());
        let resp: ListRolloutsResponse =
            self.get_json(&path, &[("pageSize", page_size.to_string())])?;
        Ok(resp.rollouts)
    }

    fn get_rollout(&self, name: &str) -> Result<RolloutStatus> {
        self.get_json(name, &[])
    }
}

/// Access token from [`ACCESS_TOKEN_ENV`], else `gcloud auth print-access-token`.
pub fn access_token(runner: &dyn CommandRunner) -> Result<String> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }
    let cmd = CliCommand::new("gcloud").args(["auth", "print-access-token"]);
    Ok(runner.capture(&cmd)?.trim().to_string())
}
