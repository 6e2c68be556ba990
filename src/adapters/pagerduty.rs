use super::{flexible_timestamp, string_or_number};
use crate::error::{AppError, Result};
use crate::models::{AlertSource, InboundAlert};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// PagerDuty webhook.
///
/// The incident is read from `payload.incident`, or from a top-level
/// `incident` when the sender flattens the envelope.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PagerDutyWebhook {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub webhook_id: String,

    #[validate(nested)]
    pub payload: Option<PagerDutyPayload>,

    #[validate(nested)]
    pub incident: Option<PagerDutyIncident>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PagerDutyPayload {
    #[validate(nested)]
    pub incident: PagerDutyIncident,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PagerDutyIncident {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(min = 1, max = 255))]
    pub id: String,

    #[validate(length(min = 1, max = 500))]
    pub title: String,

    pub status: String,

    pub severity: String,

    #[validate(nested)]
    pub service: PagerDutyService,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PagerDutyService {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl PagerDutyWebhook {
    pub fn into_alert(self) -> Result<InboundAlert> {
        let (incident, envelope_time) = match (self.payload, self.incident) {
            (Some(payload), _) => (payload.incident, payload.created_at),
            (None, Some(incident)) => (incident, None),
            (None, None) => {
                return Err(AppError::Validation(
                    "PagerDuty webhook carries no incident".to_string(),
                ))
            }
        };

        Ok(InboundAlert {
            source: AlertSource::PagerDuty,
            external_id: incident.id,
            webhook_id: self.webhook_id,
            service_name: incident.service.name,
            title: incident.title,
            severity: incident.severity,
            status: incident.status,
            occurred_at: incident.created_at.or(envelope_time),
        })
    }
}
