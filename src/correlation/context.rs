use crate::config::CorrelationConfig;
use crate::correlation::HistoryStore;
use crate::error::Result;
use crate::models::{AlertSeverity, DeployEvent, DeployStatus, ServiceRef, SimilarIncident};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Context attached to a freshly created incident
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentContext {
    pub related_deploy: Option<DeployEvent>,
    pub similar_incident: Option<SimilarIncident>,
    pub suggested_checks: String,
}

/// Looks up recent deploys and similar incidents for a service
pub struct IncidentContextBuilder {
    history: Arc<dyn HistoryStore>,
    config: CorrelationConfig,
}

impl IncidentContextBuilder {
    pub fn new(history: Arc<dyn HistoryStore>, config: CorrelationConfig) -> Self {
        Self { history, config }
    }

    /// Build the context for a new incident on `service` starting at `at`.
    ///
    /// `incident_id` is excluded from the similar-incident lookup.
    pub async fn build(
        &self,
        service: &ServiceRef,
        severity: AlertSeverity,
        at: DateTime<Utc>,
        incident_id: Uuid,
    ) -> Result<IncidentContext> {
        let related_deploy = self
            .history
            .recent_deploys(&service.id, at - self.config.deploy_lookback())
            .await?
            .into_iter()
            .find(|d| d.started_at <= at);

        let similar_incident = self
            .history
            .similar_incidents(
                &service.id,
                severity,
                at - self.config.similar_incident_lookback(),
            )
            .await?
            .into_iter()
            .find(|i| i.id != incident_id)
            .map(|i| i.as_similar());

        let suggested_checks =
            suggested_checks(&service.name, related_deploy.as_ref(), similar_incident.as_ref());

        Ok(IncidentContext {
            related_deploy,
            similar_incident,
            suggested_checks,
        })
    }
}

fn suggested_checks(
    service: &str,
    deploy: Option<&DeployEvent>,
    similar: Option<&SimilarIncident>,
) -> String {
    let mut checks = Vec::new();

    if let Some(deploy) = deploy {
        checks.push(format!("Review {} for regressions", deploy.summary()));
        if matches!(deploy.status, DeployStatus::Failure | DeployStatus::Partial) {
            checks.push(format!("Consider rolling back {}", service));
        }
    }
    if let Some(similar) = similar {
        checks.push(format!(
            "Compare with earlier incident \"{}\" ({})",
            similar.title,
            similar.started_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    checks.push(format!("Check {} health endpoints", service));
    checks.push("Review recent error logs".to_string());

    checks
        .iter()
        .enumerate()
        .map(|(i, check)| format!("{}. {}", i + 1, check))
        .collect::<Vec<_>>()
        .join("\n")
}
