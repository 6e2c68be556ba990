//! Notifier collaborators invoked by the engine once the gate allows it.
//!
//! Delivery is best effort: the engine logs and counts a failed `send`, it
//! never rolls back the incident or retries.

pub mod logging;
pub mod webhook;

pub use logging::LogNotifier;
pub use webhook::WebhookNotifier;

use crate::config::NotificationConfig;
use crate::error::Result;
use crate::models::Incident;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, incident: &Incident) -> Result<()>;

    fn name(&self) -> &str;
}

/// Fans one incident out to several notifiers.
///
/// Every notifier is attempted; the first failure is returned after all ran.
pub struct CompositeNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for CompositeNotifier {
    async fn send(&self, incident: &Incident) -> Result<()> {
        let mut first_error = None;

        for notifier in &self.notifiers {
            if let Err(e) = notifier.send(incident).await {
                tracing::warn!(
                    notifier = notifier.name(),
                    incident_id = %incident.id,
                    error = %e,
                    "Notifier failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "composite"
    }
}

/// Build the notifier chain described by configuration
pub fn build_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

    if config.log_enabled {
        notifiers.push(Arc::new(LogNotifier));
    }

    if config.webhook_enabled {
        match &config.webhook_url {
            Some(url) => {
                notifiers.push(Arc::new(WebhookNotifier::new(
                    url.clone(),
                    config.webhook_timeout_secs,
                )?));
            }
            None => tracing::warn!("Webhook notifications enabled without a webhook_url"),
        }
    }

    tracing::info!(count = notifiers.len(), "Notifiers configured");
    Ok(Arc::new(CompositeNotifier::new(notifiers)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{AlertKey, AlertSeverity, AlertSource, AlertStatus, ServiceRef};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Counting {
        async fn send(&self, _incident: &Incident) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::integration("counting", "boom"))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn incident() -> Incident {
        let now = Utc::now();
        Incident::new(
            Uuid::new_v4(),
            ServiceRef {
                id: Uuid::new_v4(),
                name: "payment".to_string(),
                organization_id: Uuid::new_v4(),
            },
            AlertKey::new(AlertSource::PagerDuty, "INC-1"),
            "High error rate".to_string(),
            AlertSeverity::Critical,
            AlertStatus::Firing,
            now,
            now,
        )
    }

    #[tokio::test]
    async fn test_composite_attempts_every_notifier() {
        let failing = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let composite = CompositeNotifier::new(vec![failing.clone(), healthy.clone()]);

        let result = composite.send(&incident()).await;

        assert!(matches!(result, Err(AppError::Integration { .. })));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_build_notifier_defaults_to_log() {
        let config = NotificationConfig {
            log_enabled: true,
            webhook_enabled: true,
            webhook_url: None,
            webhook_timeout_secs: 5,
        };
        let notifier = build_notifier(&config).unwrap();
        assert!(notifier.send(&incident()).await.is_ok());
    }
}
