use crate::clock::Clock;
use crate::config::CorrelationConfig;
use crate::correlation::{HistoryStore, IncidentContextBuilder};
use crate::directory::ServiceResolver;
use crate::error::{AppError, Result};
use crate::metrics::{
    INCIDENTS_CREATED_TOTAL, INGEST_DURATION_SECONDS, NOTIFICATIONS_TOTAL,
    WEBHOOKS_RECEIVED_TOTAL, WEBHOOK_OUTCOMES_TOTAL,
};
use crate::models::{
    AlertOutcome, AlertSource, DeployEvent, DeployOutcome, InboundAlert, InboundDeploy, Incident,
    Organization,
};
use crate::notifications::Notifier;
use crate::processing::normalize;
use crate::state::{IdempotencyStats, IdempotencyStores};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

/// Decides, for each inbound event, whether it is a duplicate, whether it
/// produces an incident, and whether that incident may notify.
pub struct CorrelationEngine {
    stores: IdempotencyStores,
    directory: Arc<dyn ServiceResolver>,
    history: Arc<dyn HistoryStore>,
    context: IncidentContextBuilder,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl CorrelationEngine {
    pub fn new(
        stores: IdempotencyStores,
        directory: Arc<dyn ServiceResolver>,
        history: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        correlation: CorrelationConfig,
    ) -> Self {
        let context = IncidentContextBuilder::new(history.clone(), correlation);
        Self {
            stores,
            directory,
            history,
            context,
            notifier,
            clock,
        }
    }

    pub fn stores(&self) -> &IdempotencyStores {
        &self.stores
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Look up an incident by id
    pub async fn get_incident(&self, id: &Uuid) -> Result<Option<Incident>> {
        self.history.get_incident(id).await
    }

    /// Current store sizes
    pub async fn stats(&self) -> Result<IdempotencyStats> {
        let stats = self.stores.stats().await?;
        crate::metrics::record_store_sizes(&stats);
        Ok(stats)
    }

    /// Process one alert for the organization registered under `organization_key`.
    ///
    /// Validation and unknown-organization failures are returned before any
    /// store is touched. Notification failures are logged, never returned.
    pub async fn process_inbound_alert(
        &self,
        organization_key: &str,
        alert: InboundAlert,
    ) -> Result<AlertOutcome> {
        let source = alert.source;
        let start = Instant::now();
        WEBHOOKS_RECEIVED_TOTAL
            .with_label_values(&[&source.to_string(), "alert"])
            .inc();

        let result = self.ingest_alert(organization_key, alert).await;

        INGEST_DURATION_SECONDS
            .with_label_values(&["alert"])
            .observe(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "rejected",
        };
        WEBHOOK_OUTCOMES_TOTAL
            .with_label_values(&[&source.to_string(), outcome])
            .inc();

        result
    }

    async fn ingest_alert(&self, organization_key: &str, alert: InboundAlert) -> Result<AlertOutcome> {
        alert.validate()?;
        if !alert.source.is_alert_source() {
            return Err(AppError::Validation(format!(
                "{} does not emit alerts",
                alert.source
            )));
        }

        let organization = self.directory.find_organization(organization_key).await?;
        let key = alert.key();
        let now = self.clock.now();

        if !self.stores.dedup.try_mark(&key, &alert.webhook_id, now).await? {
            tracing::info!(
                alert = %key,
                webhook_id = %alert.webhook_id,
                "Duplicate webhook inside dedup window, dropping"
            );
            return Ok(AlertOutcome::Dropped);
        }

        if let Some(existing) = self.stores.links.incident_for(&key, now).await? {
            self.check_link_target(&key.to_string(), existing).await;
            tracing::info!(
                alert = %key,
                incident_id = %existing,
                "Alert already has an incident, skipping"
            );
            return Ok(AlertOutcome::DuplicateIncident {
                incident_id: Some(existing),
            });
        }

        let severity = normalize::alert_severity(alert.source, &alert.severity);
        let alert_status = normalize::alert_status(alert.source, &alert.status);
        let service = self
            .directory
            .find_or_create_service(&alert.service_name, &organization)
            .await?;

        let incident_id = Uuid::new_v4();
        if let Some(existing) = self.stores.links.claim(&key, incident_id, now).await? {
            tracing::info!(
                alert = %key,
                incident_id = %existing,
                "Lost incident claim to a concurrent alert"
            );
            return Ok(AlertOutcome::DuplicateIncident {
                incident_id: Some(existing),
            });
        }

        let started_at = alert.occurred_at.unwrap_or(now);
        let context = self
            .context
            .build(&service, severity, started_at, incident_id)
            .await?;

        let mut incident = Incident::new(
            incident_id,
            service,
            key.clone(),
            alert.title,
            severity,
            alert_status,
            started_at,
            now,
        );
        incident.related_deploy = context.related_deploy;
        incident.similar_incident = context.similar_incident;
        incident.suggested_checks = context.suggested_checks;

        self.history.record_incident(&incident).await?;
        INCIDENTS_CREATED_TOTAL
            .with_label_values(&[&severity.to_string()])
            .inc();

        tracing::info!(
            alert = %key,
            incident_id = %incident.id,
            organization = %organization.organization_key,
            service = %incident.service.name,
            severity = %severity,
            related_deploy = incident.related_deploy.is_some(),
            similar_incident = incident.similar_incident.is_some(),
            "Created incident from alert"
        );

        let notified = self.dispatch_notification(&incident).await;

        Ok(AlertOutcome::Created {
            incident_id: incident.id,
            notified,
        })
    }

    /// Send a notification for `incident` unless one went out inside the
    /// suppression window. Returns true when the notifier accepted it.
    pub async fn dispatch_notification(&self, incident: &Incident) -> bool {
        let now = self.clock.now();

        match self.stores.notifications.try_acquire(&incident.id, now).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(
                    incident_id = %incident.id,
                    "Skipping duplicate notification for incident"
                );
                NOTIFICATIONS_TOTAL.with_label_values(&["suppressed"]).inc();
                return false;
            }
            Err(e) => {
                tracing::error!(
                    incident_id = %incident.id,
                    error = %e,
                    "Notification gate unavailable, not notifying"
                );
                NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
                return false;
            }
        }

        match self.notifier.send(incident).await {
            Ok(()) => {
                NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
                true
            }
            Err(e) => {
                tracing::error!(
                    incident_id = %incident.id,
                    notifier = self.notifier.name(),
                    error = %e,
                    "Failed to send notification"
                );
                NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
                false
            }
        }
    }

    /// Process one deploy event for the organization under `organization_key`
    pub async fn process_inbound_deploy(
        &self,
        organization_key: &str,
        deploy: InboundDeploy,
    ) -> Result<DeployOutcome> {
        let source = deploy.source;
        let start = Instant::now();
        WEBHOOKS_RECEIVED_TOTAL
            .with_label_values(&[&source.to_string(), "deploy"])
            .inc();

        let result = self.ingest_deploy(organization_key, deploy).await;

        INGEST_DURATION_SECONDS
            .with_label_values(&["deploy"])
            .observe(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "rejected",
        };
        WEBHOOK_OUTCOMES_TOTAL
            .with_label_values(&[&source.to_string(), outcome])
            .inc();

        result
    }

    async fn ingest_deploy(
        &self,
        organization_key: &str,
        deploy: InboundDeploy,
    ) -> Result<DeployOutcome> {
        deploy.validate()?;
        if !is_deploy_source(deploy.source) {
            return Err(AppError::Validation(format!(
                "{} does not emit deploy events",
                deploy.source
            )));
        }

        let organization = self.directory.find_organization(organization_key).await?;
        let key = deploy.key();
        let now = self.clock.now();

        if !self.stores.dedup.try_mark(&key, &deploy.webhook_id, now).await? {
            tracing::info!(
                deploy = %key,
                webhook_id = %deploy.webhook_id,
                "Duplicate deploy webhook inside dedup window, dropping"
            );
            return Ok(DeployOutcome::Dropped);
        }

        let event = self.build_deploy(&organization, deploy, now).await?;
        self.history.record_deploy(&event).await?;

        tracing::info!(
            deploy = %key,
            deploy_id = %event.id,
            organization = %organization.organization_key,
            service = %event.service_name,
            status = %event.status,
            version = ?event.version,
            "Deploy recorded"
        );

        Ok(DeployOutcome::Recorded { deploy_id: event.id })
    }

    async fn build_deploy(
        &self,
        organization: &Organization,
        deploy: InboundDeploy,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<DeployEvent> {
        let service = self
            .directory
            .find_or_create_service(&deploy.service_name, organization)
            .await?;

        Ok(DeployEvent {
            id: Uuid::new_v4(),
            source: deploy.source,
            status: normalize::deploy_status(deploy.source, &deploy.status),
            external_id: deploy.external_id,
            organization_id: organization.id,
            service_id: service.id,
            service_name: service.name,
            version: deploy.version,
            commit_sha: deploy.commit_sha,
            started_at: deploy.started_at.unwrap_or(now),
            recorded_at: now,
        })
    }

    /// A link whose incident is missing is logged; the link still wins.
    async fn check_link_target(&self, alert: &str, incident_id: Uuid) {
        match self.history.get_incident(&incident_id).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::warn!(
                alert = %alert,
                incident_id = %incident_id,
                "Alert link points at a missing incident, trusting the link"
            ),
            Err(e) => tracing::warn!(
                alert = %alert,
                incident_id = %incident_id,
                error = %e,
                "Could not verify linked incident"
            ),
        }
    }
}

/// True for the two sources the engine accepts deploys from
pub fn is_deploy_source(source: AlertSource) -> bool {
    !source.is_alert_source()
}
