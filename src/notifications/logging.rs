use crate::error::Result;
use crate::models::Incident;
use crate::notifications::Notifier;
use async_trait::async_trait;

/// Writes a one-line structured summary of the incident to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, incident: &Incident) -> Result<()> {
        tracing::info!(
            incident_id = %incident.id,
            service = %incident.service.name,
            severity = %incident.severity,
            alert = %incident.alert,
            related_deploy = ?incident.related_deploy.as_ref().map(|d| d.summary()),
            similar_incident = ?incident.similar_incident.as_ref().map(|s| s.id),
            title = %incident.title,
            "Incident notification"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
