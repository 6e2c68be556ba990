use crate::error::Result;
use crate::models::{AlertSeverity, DeployEvent, Incident};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Deploy and incident history consulted when correlating a new incident
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record_deploy(&self, deploy: &DeployEvent) -> Result<()>;

    async fn record_incident(&self, incident: &Incident) -> Result<()>;

    async fn get_incident(&self, id: &Uuid) -> Result<Option<Incident>>;

    /// Deploys on the service started at or after `since`, newest first
    async fn recent_deploys(&self, service_id: &Uuid, since: DateTime<Utc>)
        -> Result<Vec<DeployEvent>>;

    /// Incidents on the service with the same severity started at or after
    /// `since`, newest first
    async fn similar_incidents(
        &self,
        service_id: &Uuid,
        severity: AlertSeverity,
        since: DateTime<Utc>,
    ) -> Result<Vec<Incident>>;

    async fn incident_count(&self) -> Result<usize>;

    /// Drop deploys started before `before`, returning how many went
    async fn prune_deploys(&self, before: DateTime<Utc>) -> Result<usize>;

    /// Drop incidents started before `before`, returning how many went
    async fn prune_incidents(&self, before: DateTime<Utc>) -> Result<usize>;
}

#[derive(Clone, Default)]
pub struct InMemoryHistory {
    incidents: Arc<DashMap<Uuid, Incident>>,
    deploys: Arc<DashMap<Uuid, Vec<DeployEvent>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn record_deploy(&self, deploy: &DeployEvent) -> Result<()> {
        self.deploys
            .entry(deploy.service_id)
            .or_default()
            .push(deploy.clone());
        tracing::debug!(deploy_id = %deploy.id, service = %deploy.service_name, "Deploy recorded");
        Ok(())
    }

    async fn record_incident(&self, incident: &Incident) -> Result<()> {
        self.incidents.insert(incident.id, incident.clone());
        tracing::debug!(incident_id = %incident.id, "Incident recorded");
        Ok(())
    }

    async fn get_incident(&self, id: &Uuid) -> Result<Option<Incident>> {
        Ok(self.incidents.get(id).map(|entry| entry.clone()))
    }

    async fn recent_deploys(
        &self,
        service_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<DeployEvent>> {
        let mut deploys: Vec<DeployEvent> = self
            .deploys
            .get(service_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|d| d.started_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        deploys.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(deploys)
    }

    async fn similar_incidents(
        &self,
        service_id: &Uuid,
        severity: AlertSeverity,
        since: DateTime<Utc>,
    ) -> Result<Vec<Incident>> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|entry| {
                let incident = entry.value();
                incident.service.id == *service_id
                    && incident.severity == severity
                    && incident.started_at >= since
            })
            .map(|entry| entry.value().clone())
            .collect();

        incidents.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(incidents)
    }

    async fn incident_count(&self) -> Result<usize> {
        Ok(self.incidents.len())
    }

    async fn prune_deploys(&self, before: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        self.deploys.retain(|_, deploys| {
            let len = deploys.len();
            deploys.retain(|d| d.started_at >= before);
            removed += len - deploys.len();
            !deploys.is_empty()
        });
        Ok(removed)
    }

    async fn prune_incidents(&self, before: DateTime<Utc>) -> Result<usize> {
        let len = self.incidents.len();
        self.incidents
            .retain(|_, incident| incident.started_at >= before);
        Ok(len.saturating_sub(self.incidents.len()))
    }
}
