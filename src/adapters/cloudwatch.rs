use super::flexible_timestamp;
use crate::error::Result;
use crate::models::{AlertSource, InboundAlert};
use crate::processing::normalize::extract_service_name;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// CloudWatch alarm state change delivered through EventBridge
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CloudWatchWebhook {
    #[validate(length(min = 1, max = 255))]
    pub id: String,

    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub account: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub time: Option<DateTime<Utc>>,

    #[validate(nested)]
    pub detail: AlarmDetail,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AlarmDetail {
    #[validate(length(min = 1, max = 500))]
    pub alarm_name: String,

    pub state: AlarmState,

    #[serde(default)]
    pub state_reason: Option<String>,
}

/// Alarm state, either a bare string or EventBridge's `{ "value": .. }` object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AlarmState {
    Plain(String),
    Detailed {
        value: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl AlarmState {
    pub fn value(&self) -> &str {
        match self {
            AlarmState::Plain(value) => value,
            AlarmState::Detailed { value, .. } => value,
        }
    }
}

impl CloudWatchWebhook {
    /// The event id doubles as webhook id; the service is the alarm's first
    /// hyphen-delimited token.
    pub fn into_alert(self) -> Result<InboundAlert> {
        Ok(InboundAlert {
            source: AlertSource::CloudWatch,
            webhook_id: self.id.clone(),
            external_id: self.id,
            service_name: extract_service_name(&self.detail.alarm_name),
            severity: self.detail.state.value().to_string(),
            status: "FIRING".to_string(),
            title: self.detail.alarm_name,
            occurred_at: self.time,
        })
    }
}
