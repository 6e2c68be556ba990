use crate::error::{AppError, Result};
use crate::models::Incident;
use crate::notifications::Notifier;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Posts a flat JSON summary of each incident to a fixed URL
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event_type: &'static str,
    timestamp: String,
    incident: IncidentWebhookData<'a>,
}

#[derive(Debug, Serialize)]
struct IncidentWebhookData<'a> {
    id: String,
    organization_id: String,
    service: &'a str,
    alert_source: String,
    alert_id: &'a str,
    title: &'a str,
    severity: String,
    status: String,
    started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recent_deploy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    similar_incident: Option<String>,
    suggested_checks: &'a str,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            timeout_secs,
        })
    }

    fn build_payload(incident: &Incident) -> WebhookPayload<'_> {
        WebhookPayload {
            event_type: "incident.created",
            timestamp: Utc::now().to_rfc3339(),
            incident: IncidentWebhookData {
                id: incident.id.to_string(),
                organization_id: incident.organization_id.to_string(),
                service: &incident.service.name,
                alert_source: incident.alert.source.to_string(),
                alert_id: &incident.alert.external_id,
                title: &incident.title,
                severity: incident.severity.to_string(),
                status: incident.status.to_string(),
                started_at: incident.started_at.to_rfc3339(),
                recent_deploy: incident.related_deploy.as_ref().map(|d| d.summary()),
                similar_incident: incident
                    .similar_incident
                    .as_ref()
                    .map(|s| format!("{} ({})", s.title, s.id)),
                suggested_checks: &incident.suggested_checks,
            },
        }
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("User-Agent", concat!("signalroot/", env!("CARGO_PKG_VERSION")))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::integration(
                        "webhook",
                        format!("request timed out after {} seconds", self.timeout_secs),
                    )
                } else {
                    AppError::integration("webhook", format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::integration(
                "webhook",
                format!("endpoint returned {}: {}", status, body),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, incident: &Incident) -> Result<()> {
        let payload = Self::build_payload(incident);

        match self.post(&payload).await {
            Ok(()) => {
                info!(
                    incident_id = %incident.id,
                    url = %self.url,
                    "Webhook notification sent"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    incident_id = %incident.id,
                    url = %self.url,
                    error = %e,
                    "Failed to send webhook notification"
                );
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertKey, AlertSeverity, AlertSource, AlertStatus, ServiceRef};
    use uuid::Uuid;

    #[test]
    fn test_payload_shape() {
        let now = Utc::now();
        let incident = Incident::new(
            Uuid::new_v4(),
            ServiceRef {
                id: Uuid::new_v4(),
                name: "payment".to_string(),
                organization_id: Uuid::new_v4(),
            },
            AlertKey::new(AlertSource::CloudWatch, "evt-1"),
            "payment-service-high-cpu".to_string(),
            AlertSeverity::High,
            AlertStatus::Firing,
            now,
            now,
        );

        let json = serde_json::to_value(WebhookNotifier::build_payload(&incident)).unwrap();
        assert_eq!(json["event_type"], "incident.created");
        assert_eq!(json["incident"]["alert_source"], "cloudwatch");
        assert_eq!(json["incident"]["severity"], "HIGH");
        assert_eq!(json["incident"]["status"], "ACTIVE");
        assert!(json["incident"].get("recent_deploy").is_none());
    }
}
