//! Per-source webhook payloads and their translation into engine input.
//!
//! Each adapter deserializes the provider's JSON into a typed payload,
//! validates it, and extracts the event identity. Nothing here touches the
//! idempotency stores: a payload that fails to parse or validate is rejected
//! before the engine sees it.

pub mod cloudwatch;
pub mod github;
pub mod jenkins;
pub mod pagerduty;

pub use cloudwatch::CloudWatchWebhook;
pub use github::GitHubDeployWebhook;
pub use jenkins::JenkinsBuildWebhook;
pub use pagerduty::PagerDutyWebhook;

use crate::error::{AppError, Result};
use crate::models::{AlertSource, InboundAlert, InboundDeploy};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// An inbound webhook translated for the engine
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Alert(InboundAlert),
    Deploy(InboundDeploy),
}

/// Parse a raw JSON body received for `source`
pub fn parse_event(source: AlertSource, body: serde_json::Value) -> Result<InboundEvent> {
    match source {
        AlertSource::PagerDuty => {
            let payload: PagerDutyWebhook = decode(body)?;
            Ok(InboundEvent::Alert(payload.into_alert()?))
        }
        AlertSource::CloudWatch => {
            let payload: CloudWatchWebhook = decode(body)?;
            Ok(InboundEvent::Alert(payload.into_alert()?))
        }
        AlertSource::GitHub => {
            let payload: GitHubDeployWebhook = decode(body)?;
            Ok(InboundEvent::Deploy(payload.into_deploy()?))
        }
        AlertSource::Jenkins => {
            let payload: JenkinsBuildWebhook = decode(body)?;
            Ok(InboundEvent::Deploy(payload.into_deploy()?))
        }
    }
}

/// Deserialize and validate; both failures are caller errors
fn decode<T>(body: serde_json::Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Malformed payload: {}", e)))?;
    payload.validate()?;
    Ok(payload)
}

/// Accept ids sent either as JSON strings or numbers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// Accept RFC 3339 strings or epoch milliseconds
pub(crate) fn flexible_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        Some(Raw::Millis(ms)) => Ok(Utc.timestamp_millis_opt(ms).single()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Ids {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "flexible_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_string_or_number() {
        let ids: Ids = serde_json::from_value(json!({"id": 1234})).unwrap();
        assert_eq!(ids.id, "1234");
        let ids: Ids = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(ids.id, "abc");
        assert!(ids.at.is_none());
    }

    #[test]
    fn test_flexible_timestamp() {
        let ids: Ids =
            serde_json::from_value(json!({"id": 1, "at": 1_700_000_000_000i64})).unwrap();
        assert_eq!(ids.at.unwrap().timestamp(), 1_700_000_000);

        let ids: Ids =
            serde_json::from_value(json!({"id": 1, "at": "2024-05-01T10:00:00Z"})).unwrap();
        assert_eq!(ids.at.unwrap().to_rfc3339(), "2024-05-01T10:00:00+00:00");

        assert!(serde_json::from_value::<Ids>(json!({"id": 1, "at": "yesterday"})).is_err());
    }

    #[test]
    fn test_malformed_body_is_validation_error() {
        let err = parse_event(AlertSource::PagerDuty, json!({"hello": "world"})).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
