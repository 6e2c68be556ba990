use super::{flexible_timestamp, string_or_number};
use crate::error::Result;
use crate::models::{AlertSource, InboundDeploy};
use crate::processing::normalize::extract_service_name;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// GitHub `deployment` / `deployment_status` webhook
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GitHubDeployWebhook {
    #[serde(default)]
    pub action: Option<String>,

    #[validate(nested)]
    pub deployment: Deployment,

    /// Present on `deployment_status` events
    #[serde(default)]
    pub deployment_status: Option<DeploymentStatus>,

    #[validate(nested)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Deployment {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(min = 1, max = 255))]
    pub id: String,

    #[serde(default)]
    pub sha: Option<String>,

    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub status: Option<DeploymentStatus>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentStatus {
    pub state: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Repository {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    pub full_name: Option<String>,
}

impl GitHubDeployWebhook {
    /// Deployment id is both identity and webhook id. The deploy state comes
    /// from `deployment_status`, then `deployment.status`, else pending.
    pub fn into_deploy(self) -> Result<InboundDeploy> {
        let state = self
            .deployment_status
            .or(self.deployment.status)
            .map(|s| s.state)
            .unwrap_or_else(|| "pending".to_string());

        Ok(InboundDeploy {
            source: AlertSource::GitHub,
            webhook_id: self.deployment.id.clone(),
            external_id: self.deployment.id,
            service_name: extract_service_name(&self.repository.name),
            version: self.deployment.git_ref,
            commit_sha: self.deployment.sha,
            status: state,
            started_at: self.deployment.created_at,
        })
    }
}
