use crate::error::Result;
use crate::models::AlertKey;
use crate::state::{
    is_live, AlertIncidentIndex, AlertIncidentLink, DedupStore, NotificationGate,
    NotificationMark, WebhookRecord, Windows,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory idempotency store backed by three independent maps.
///
/// Each per-key decision runs under the shard lock of that key's entry, so
/// check-evict-insert is atomic per key. No operation touches more than one map.
#[derive(Clone)]
pub struct InMemoryIdempotencyStore {
    webhooks: Arc<DashMap<String, WebhookRecord>>,
    links: Arc<DashMap<String, AlertIncidentLink>>,
    notifications: Arc<DashMap<Uuid, NotificationMark>>,
    windows: Windows,
}

impl InMemoryIdempotencyStore {
    pub fn new(windows: Windows) -> Self {
        Self {
            webhooks: Arc::new(DashMap::new()),
            links: Arc::new(DashMap::new()),
            notifications: Arc::new(DashMap::new()),
            windows,
        }
    }

    pub fn windows(&self) -> Windows {
        self.windows
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new(Windows::default())
    }
}

/// Remove entries whose stamp is before `cutoff`
fn retain_since<K, V>(
    map: &DashMap<K, V>,
    cutoff: DateTime<Utc>,
    stamp: impl Fn(&V) -> DateTime<Utc>,
) -> usize
where
    K: Eq + std::hash::Hash,
{
    let mut removed = 0;
    map.retain(|_, value| {
        let keep = stamp(value) >= cutoff;
        if !keep {
            removed += 1;
        }
        keep
    });
    removed
}

#[async_trait]
impl DedupStore for InMemoryIdempotencyStore {
    async fn should_process(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.dedup;
        match self.webhooks.entry(key.storage_key()) {
            Entry::Occupied(entry) => {
                if is_live(entry.get().processed_at, window, now) {
                    Ok(false)
                } else {
                    entry.remove();
                    tracing::debug!(key = %key, "Expired webhook record evicted");
                    Ok(true)
                }
            }
            Entry::Vacant(_) => Ok(true),
        }
    }

    async fn mark_processed(
        &self,
        key: &AlertKey,
        webhook_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.webhooks.insert(
            key.storage_key(),
            WebhookRecord {
                webhook_id: webhook_id.to_string(),
                processed_at: now,
            },
        );
        Ok(())
    }

    async fn try_mark(&self, key: &AlertKey, webhook_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.dedup;
        let record = WebhookRecord {
            webhook_id: webhook_id.to_string(),
            processed_at: now,
        };

        match self.webhooks.entry(key.storage_key()) {
            Entry::Occupied(mut entry) => {
                if is_live(entry.get().processed_at, window, now) {
                    Ok(false)
                } else {
                    entry.insert(record);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(true)
            }
        }
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(retain_since(&self.webhooks, cutoff, |r| r.processed_at))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.webhooks.len())
    }
}

#[async_trait]
impl AlertIncidentIndex for InMemoryIdempotencyStore {
    async fn incident_for(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        let retention = self.windows.link_retention;
        match self.links.entry(key.storage_key()) {
            Entry::Occupied(entry) => {
                if retention.is_live(entry.get().linked_at, now) {
                    Ok(Some(entry.get().incident_id))
                } else {
                    entry.remove();
                    tracing::debug!(key = %key, "Expired alert link evicted");
                    Ok(None)
                }
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn associate(&self, key: &AlertKey, incident_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.links.insert(
            key.storage_key(),
            AlertIncidentLink {
                incident_id,
                linked_at: now,
            },
        );
        Ok(())
    }

    async fn claim(
        &self,
        key: &AlertKey,
        incident_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let retention = self.windows.link_retention;
        let link = AlertIncidentLink {
            incident_id,
            linked_at: now,
        };

        match self.links.entry(key.storage_key()) {
            Entry::Occupied(mut entry) => {
                if retention.is_live(entry.get().linked_at, now) {
                    Ok(Some(entry.get().incident_id))
                } else {
                    entry.insert(link);
                    Ok(None)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(link);
                Ok(None)
            }
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let retention = self.windows.link_retention;
        match retention {
            super::LinkRetention::Permanent => Ok(0),
            super::LinkRetention::Expire { ttl } => {
                Ok(retain_since(&self.links, now - ttl, |l| l.linked_at))
            }
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.links.len())
    }
}

#[async_trait]
impl NotificationGate for InMemoryIdempotencyStore {
    async fn should_notify(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.notification;
        match self.notifications.entry(*incident_id) {
            Entry::Occupied(entry) => {
                if is_live(entry.get().last_sent_at, window, now) {
                    Ok(false)
                } else {
                    entry.remove();
                    Ok(true)
                }
            }
            Entry::Vacant(_) => Ok(true),
        }
    }

    async fn mark_sent(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<()> {
        self.notifications
            .insert(*incident_id, NotificationMark { last_sent_at: now });
        Ok(())
    }

    async fn try_acquire(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.notification;
        let mark = NotificationMark { last_sent_at: now };

        match self.notifications.entry(*incident_id) {
            Entry::Occupied(mut entry) => {
                if is_live(entry.get().last_sent_at, window, now) {
                    Ok(false)
                } else {
                    entry.insert(mark);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(mark);
                Ok(true)
            }
        }
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(retain_since(&self.notifications, cutoff, |m| m.last_sent_at))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.notifications.len())
    }
}
