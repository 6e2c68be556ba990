use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::alert::{AlertKey, AlertSeverity, AlertStatus};
use super::deploy::DeployEvent;
use super::organization::ServiceRef;

/// Incident produced by the correlation engine for a newly seen alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier
    pub id: Uuid,

    pub organization_id: Uuid,

    pub service: ServiceRef,

    /// Alert identity that produced this incident
    pub alert: AlertKey,

    pub title: String,

    pub severity: AlertSeverity,

    /// Status of the originating alert at creation time
    pub alert_status: AlertStatus,

    pub status: IncidentStatus,

    pub started_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    /// Most recent deploy on the same service inside the lookback
    pub related_deploy: Option<DeployEvent>,

    /// Most recent earlier incident with the same service and severity
    pub similar_incident: Option<SimilarIncident>,

    /// Remediation hints, one per line
    pub suggested_checks: String,
}

impl Incident {
    /// Create a new incident with empty correlation context
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        service: ServiceRef,
        alert: AlertKey,
        title: String,
        severity: AlertSeverity,
        alert_status: AlertStatus,
        started_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id: service.organization_id,
            service,
            alert,
            title,
            severity,
            alert_status,
            status: IncidentStatus::Active,
            started_at,
            created_at,
            related_deploy: None,
            similar_incident: None,
            suggested_checks: String::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            IncidentStatus::Active | IncidentStatus::Acknowledged
        )
    }

    /// Reference used when this incident is attached to a later one
    pub fn as_similar(&self) -> SimilarIncident {
        SimilarIncident {
            id: self.id,
            title: self.title.clone(),
            started_at: self.started_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Active,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarIncident {
    pub id: Uuid,
    pub title: String,
    pub started_at: DateTime<Utc>,
}
