use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

use super::alert::{AlertKey, AlertSource};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStatus {
    InProgress,
    Success,
    Failure,
    Partial,
}

/// A deploy recorded in history, used as correlation context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployEvent {
    pub id: Uuid,
    pub source: AlertSource,
    pub external_id: String,
    pub organization_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub version: Option<String>,
    pub commit_sha: Option<String>,
    pub status: DeployStatus,
    pub started_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl DeployEvent {
    /// Short human summary, e.g. `github deploy v2.4.1 (SUCCESS)`
    pub fn summary(&self) -> String {
        match &self.version {
            Some(version) => format!("{} deploy {} ({})", self.source, version, self.status),
            None => format!("{} deploy {} ({})", self.source, self.external_id, self.status),
        }
    }
}

/// Source-agnostic deploy handed to the engine by the adapters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InboundDeploy {
    pub source: AlertSource,

    #[validate(length(min = 1, max = 255))]
    pub external_id: String,

    #[validate(length(min = 1, max = 255))]
    pub webhook_id: String,

    #[validate(length(min = 1, max = 255))]
    pub service_name: String,

    pub version: Option<String>,

    pub commit_sha: Option<String>,

    /// Raw provider state, mapped by the engine
    pub status: String,

    pub started_at: Option<DateTime<Utc>>,
}

impl InboundDeploy {
    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.source, self.external_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeployOutcome {
    Dropped,
    Recorded { deploy_id: Uuid },
}

impl DeployOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DeployOutcome::Dropped => "dropped",
            DeployOutcome::Recorded { .. } => "recorded",
        }
    }
}
