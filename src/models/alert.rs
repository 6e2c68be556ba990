use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// External system an event arrived from
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertSource {
    PagerDuty,
    CloudWatch,
    GitHub,
    Jenkins,
}

impl AlertSource {
    /// Sources that emit alerts rather than deploy events
    pub fn is_alert_source(&self) -> bool {
        matches!(self, AlertSource::PagerDuty | AlertSource::CloudWatch)
    }
}

/// Identity of an inbound event: `(source, externalId)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub source: AlertSource,
    pub external_id: String,
}

impl AlertKey {
    pub fn new(source: AlertSource, external_id: impl Into<String>) -> Self {
        Self {
            source,
            external_id: external_id.into(),
        }
    }

    /// Flat key used by the stores, `"<source>:<externalId>"`
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.source, self.external_id)
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.external_id)
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// Source-agnostic alert handed to the engine by the adapters.
///
/// `severity` and `status` are the raw provider strings; the engine maps them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InboundAlert {
    pub source: AlertSource,

    #[validate(length(min = 1, max = 255))]
    pub external_id: String,

    #[validate(length(min = 1, max = 255))]
    pub webhook_id: String,

    #[validate(length(min = 1, max = 255))]
    pub service_name: String,

    #[validate(length(min = 1, max = 500))]
    pub title: String,

    pub severity: String,

    pub status: String,

    /// When the provider says the alert started
    pub occurred_at: Option<DateTime<Utc>>,
}

impl InboundAlert {
    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.source, self.external_id.clone())
    }
}

/// Result of feeding one alert through the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    /// Same webhook seen inside the dedup window
    Dropped,
    /// A new incident was created
    Created { incident_id: Uuid, notified: bool },
    /// The alert identity already produced an incident
    DuplicateIncident { incident_id: Option<Uuid> },
}

impl AlertOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AlertOutcome::Dropped => "dropped",
            AlertOutcome::Created { .. } => "created",
            AlertOutcome::DuplicateIncident { .. } => "duplicate_incident",
        }
    }

    pub fn incident_id(&self) -> Option<Uuid> {
        match self {
            AlertOutcome::Dropped => None,
            AlertOutcome::Created { incident_id, .. } => Some(*incident_id),
            AlertOutcome::DuplicateIncident { incident_id } => *incident_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_storage_key_format() {
        let key = AlertKey::new(AlertSource::PagerDuty, "INC-1");
        assert_eq!(key.storage_key(), "pagerduty:INC-1");
        assert_eq!(
            AlertKey::new(AlertSource::CloudWatch, "abc").to_string(),
            "cloudwatch:abc"
        );
    }

    #[test]
    fn test_source_parsing_is_case_insensitive() {
        assert_eq!(
            AlertSource::from_str("PagerDuty").unwrap(),
            AlertSource::PagerDuty
        );
        assert_eq!(AlertSource::from_str("github").unwrap(), AlertSource::GitHub);
        assert!(AlertSource::from_str("datadog").is_err());
    }

    #[test]
    fn test_inbound_alert_validation() {
        let alert = InboundAlert {
            source: AlertSource::PagerDuty,
            external_id: String::new(),
            webhook_id: "wh-1".to_string(),
            service_name: "payment".to_string(),
            title: "High error rate".to_string(),
            severity: "critical".to_string(),
            status: "triggered".to_string(),
            occurred_at: None,
        };
        assert!(alert.validate().is_err());
    }

    #[test]
    fn test_outcome_serialization() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(AlertOutcome::Created {
            incident_id: id,
            notified: true,
        })
        .unwrap();
        assert_eq!(json["outcome"], "created");
        assert_eq!(json["incident_id"], id.to_string());
    }
}
