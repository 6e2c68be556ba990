use crate::clock::Clock;
use crate::config::CorrelationConfig;
use crate::correlation::HistoryStore;
use crate::error::Result;
use crate::metrics::SWEEP_EVICTIONS_TOTAL;
use crate::state::{IdempotencyStats, IdempotencyStores};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::interval;

/// What one sweep removed, and what is left
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepReport {
    pub swept_at: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub webhooks_removed: usize,
    pub notifications_removed: usize,
    pub links_removed: usize,
    pub deploys_pruned: usize,
    pub incidents_pruned: usize,
    pub remaining: IdempotencyStats,
}

/// Evicts expired webhook records and notification marks.
///
/// Alert links are only touched when the link retention policy expires them.
/// History is pruned past the correlation lookbacks, since nothing older can
/// be attached to a new incident.
pub struct CleanupSweeper {
    stores: IdempotencyStores,
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    deploy_horizon: Duration,
    incident_horizon: Duration,
    interval: std::time::Duration,
}

impl CleanupSweeper {
    pub fn new(
        stores: IdempotencyStores,
        history: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
        retention: Duration,
        correlation: &CorrelationConfig,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            stores,
            history,
            clock,
            retention,
            deploy_horizon: correlation.deploy_lookback(),
            incident_horizon: correlation.similar_incident_lookback(),
            interval,
        }
    }

    /// Sweep against the clock's current time
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        self.sweep(self.clock.now()).await
    }

    /// Remove entries stamped more than the retention horizon before `now`.
    ///
    /// Stores are visited one at a time.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let cutoff = now - self.retention;

        let webhooks_removed = self.stores.dedup.sweep(cutoff).await?;
        let notifications_removed = self.stores.notifications.sweep(cutoff).await?;
        let links_removed = self.stores.links.sweep_expired(now).await?;
        let deploys_pruned = self.history.prune_deploys(now - self.deploy_horizon).await?;
        let incidents_pruned = self
            .history
            .prune_incidents(now - self.incident_horizon)
            .await?;

        SWEEP_EVICTIONS_TOTAL
            .with_label_values(&["webhooks"])
            .inc_by(webhooks_removed as f64);
        SWEEP_EVICTIONS_TOTAL
            .with_label_values(&["notifications"])
            .inc_by(notifications_removed as f64);
        SWEEP_EVICTIONS_TOTAL
            .with_label_values(&["alert_links"])
            .inc_by(links_removed as f64);
        SWEEP_EVICTIONS_TOTAL
            .with_label_values(&["deploys"])
            .inc_by(deploys_pruned as f64);
        SWEEP_EVICTIONS_TOTAL
            .with_label_values(&["incidents"])
            .inc_by(incidents_pruned as f64);

        let remaining = self.stores.stats().await?;
        crate::metrics::record_store_sizes(&remaining);

        tracing::info!(
            webhooks_removed,
            notifications_removed,
            links_removed,
            deploys_pruned,
            incidents_pruned,
            processed_webhooks = remaining.processed_webhooks,
            active_notifications = remaining.active_notifications,
            alert_to_incident_mappings = remaining.alert_to_incident_mappings,
            "Idempotency sweep completed"
        );

        Ok(SweepReport {
            swept_at: now,
            cutoff,
            webhooks_removed,
            notifications_removed,
            links_removed,
            deploys_pruned,
            incidents_pruned,
            remaining,
        })
    }

    /// Sweep on a fixed interval until the task is dropped
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            retention_secs = self.retention.num_seconds(),
            "Starting cleanup sweeper"
        );

        let mut ticker = interval(self.interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            tracing::debug!("Running idempotency sweep");

            if let Err(e) = self.sweep_now().await {
                tracing::error!(error = %e, "Idempotency sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::correlation::InMemoryHistory;
    use crate::models::{AlertKey, AlertSource};
    use crate::state::{create_in_memory_stores, LinkRetention, Windows};
    use uuid::Uuid;

    fn sweeper(windows: Windows) -> (CleanupSweeper, IdempotencyStores, Arc<ManualClock>) {
        let stores = create_in_memory_stores(windows);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sweeper = CleanupSweeper::new(
            stores.clone(),
            Arc::new(InMemoryHistory::new()),
            clock.clone(),
            Duration::hours(2),
            &CorrelationConfig::default(),
            std::time::Duration::from_secs(300),
        );
        (sweeper, stores, clock)
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_and_links() {
        let (sweeper, stores, clock) = sweeper(Windows::default());
        let t0 = clock.now();
        let old = AlertKey::new(AlertSource::PagerDuty, "old");
        let fresh = AlertKey::new(AlertSource::PagerDuty, "fresh");

        stores.dedup.mark_processed(&old, "wh-old", t0).await.unwrap();
        stores.links.associate(&old, Uuid::new_v4(), t0).await.unwrap();
        stores.notifications.mark_sent(&Uuid::new_v4(), t0).await.unwrap();

        clock.advance(Duration::hours(3));
        stores
            .dedup
            .mark_processed(&fresh, "wh-fresh", clock.now())
            .await
            .unwrap();

        let report = sweeper.sweep_now().await.unwrap();
        assert_eq!(report.webhooks_removed, 1);
        assert_eq!(report.notifications_removed, 1);
        assert_eq!(report.links_removed, 0);
        assert_eq!(report.remaining.processed_webhooks, 1);
        assert_eq!(report.remaining.alert_to_incident_mappings, 1);
    }

    #[tokio::test]
    async fn test_sweep_expires_links_under_expire_policy() {
        let (sweeper, stores, clock) = sweeper(Windows {
            link_retention: LinkRetention::Expire {
                ttl: Duration::hours(24),
            },
            ..Windows::default()
        });
        let key = AlertKey::new(AlertSource::CloudWatch, "evt-1");
        stores
            .links
            .associate(&key, Uuid::new_v4(), clock.now())
            .await
            .unwrap();

        clock.advance(Duration::hours(25));
        let report = sweeper.sweep_now().await.unwrap();
        assert_eq!(report.links_removed, 1);
        assert_eq!(report.remaining, IdempotencyStats::default());
    }

    #[tokio::test]
    async fn test_sweep_on_empty_stores() {
        let (sweeper, _, _) = sweeper(Windows::default());
        let report = sweeper.sweep(Utc::now()).await.unwrap();
        assert_eq!(report.webhooks_removed, 0);
        assert_eq!(report.cutoff, report.swept_at - Duration::hours(2));
    }

    #[tokio::test]
    async fn test_sweep_prunes_history_past_lookbacks() {
        use crate::models::{AlertSeverity, AlertStatus, Incident, ServiceRef};

        let stores = create_in_memory_stores(Windows::default());
        let history = Arc::new(InMemoryHistory::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sweeper = CleanupSweeper::new(
            stores,
            history.clone(),
            clock.clone(),
            Duration::hours(2),
            &CorrelationConfig::default(),
            std::time::Duration::from_secs(300),
        );

        let service = ServiceRef {
            id: Uuid::new_v4(),
            name: "search".to_string(),
            organization_id: Uuid::new_v4(),
        };
        let incident = Incident::new(
            Uuid::new_v4(),
            service,
            AlertKey::new(AlertSource::PagerDuty, "INC-old"),
            "Search timeouts".to_string(),
            AlertSeverity::High,
            AlertStatus::Firing,
            clock.now(),
            clock.now(),
        );
        history.record_incident(&incident).await.unwrap();

        clock.advance(Duration::days(6));
        assert_eq!(sweeper.sweep_now().await.unwrap().incidents_pruned, 0);

        clock.advance(Duration::days(2));
        let report = sweeper.sweep_now().await.unwrap();
        assert_eq!(report.incidents_pruned, 1);
        assert_eq!(history.incident_count().await.unwrap(), 0);
    }
}
