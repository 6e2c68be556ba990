use crate::error::{AppError, Result};
use crate::models::AlertKey;
use crate::state::{
    is_live, AlertIncidentIndex, AlertIncidentLink, DedupStore, LinkRetention,
    NotificationGate, NotificationMark, WebhookRecord, Windows,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, IVec, Tree};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent idempotency store using the Sled embedded database.
///
/// One tree per contract: `webhooks`, `alert_links`, `notifications`.
/// Atomic primitives are compare-and-swap loops on a single key.
#[derive(Clone)]
pub struct SledIdempotencyStore {
    db: Arc<Db>,
    webhooks: Tree,
    links: Tree,
    notifications: Tree,
    windows: Windows,
}

impl SledIdempotencyStore {
    /// Open (or create) a store at the specified path
    pub fn new<P: AsRef<Path>>(path: P, windows: Windows) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            AppError::Storage(format!("Failed to open Sled database: {}", e))
        })?;

        let open = |name: &str| {
            db.open_tree(name).map_err(|e| {
                AppError::Storage(format!("Failed to open {} tree: {}", name, e))
            })
        };
        let webhooks = open("webhooks")?;
        let links = open("alert_links")?;
        let notifications = open("notifications")?;

        tracing::info!(path = ?path.as_ref(), "Initialized Sled idempotency store");

        Ok(Self {
            db: Arc::new(db),
            webhooks,
            links,
            notifications,
            windows,
        })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.map_err(|e| {
            AppError::Storage(format!("Failed to flush database: {}", e))
        })?;
        Ok(())
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| {
            AppError::Serialization(format!("Failed to serialize record: {}", e))
        })
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| {
            AppError::Serialization(format!("Failed to deserialize record: {}", e))
        })
    }

    fn read<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<(IVec, T)>> {
        match tree.get(key)? {
            Some(raw) => {
                let value = Self::decode(&raw)?;
                Ok(Some((raw, value)))
            }
            None => Ok(None),
        }
    }

    /// Returns the live record for `key`, evicting an expired one.
    fn live_or_evict<T: DeserializeOwned>(
        tree: &Tree,
        key: &[u8],
        live: impl Fn(&T) -> bool,
    ) -> Result<Option<T>> {
        loop {
            let Some((raw, value)) = Self::read::<T>(tree, key)? else {
                return Ok(None);
            };
            if live(&value) {
                return Ok(Some(value));
            }
            // Lost the race to a concurrent writer: re-read
            if tree
                .compare_and_swap(key, Some(raw), None as Option<IVec>)?
                .is_ok()
            {
                return Ok(None);
            }
        }
    }

    /// Insert `new` unless a live record exists. Returns the live record on refusal.
    fn insert_unless_live<T: DeserializeOwned>(
        tree: &Tree,
        key: &[u8],
        new: Vec<u8>,
        live: impl Fn(&T) -> bool,
    ) -> Result<Option<T>> {
        loop {
            let current = Self::read::<T>(tree, key)?;
            let expected = match current {
                Some((raw, value)) => {
                    if live(&value) {
                        return Ok(Some(value));
                    }
                    Some(raw)
                }
                None => None,
            };
            if tree
                .compare_and_swap(key, expected, Some(new.clone()))?
                .is_ok()
            {
                return Ok(None);
            }
        }
    }

    /// Remove every record stamped before `cutoff`, skipping ones rewritten meanwhile
    fn sweep_tree<T: DeserializeOwned>(
        tree: &Tree,
        cutoff: DateTime<Utc>,
        stamp: impl Fn(&T) -> DateTime<Utc>,
    ) -> Result<usize> {
        let mut removed = 0;
        for item in tree.iter() {
            let (key, raw) = item?;
            let value: T = Self::decode(&raw)?;
            if stamp(&value) < cutoff
                && tree
                    .compare_and_swap(&key, Some(raw), None as Option<IVec>)?
                    .is_ok()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl DedupStore for SledIdempotencyStore {
    async fn should_process(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.dedup;
        let live = Self::live_or_evict::<WebhookRecord>(
            &self.webhooks,
            key.storage_key().as_bytes(),
            |r| is_live(r.processed_at, window, now),
        )?;
        Ok(live.is_none())
    }

    async fn mark_processed(
        &self,
        key: &AlertKey,
        webhook_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let record = Self::encode(&WebhookRecord {
            webhook_id: webhook_id.to_string(),
            processed_at: now,
        })?;
        self.webhooks.insert(key.storage_key().as_bytes(), record)?;
        Ok(())
    }

    async fn try_mark(&self, key: &AlertKey, webhook_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.dedup;
        let record = Self::encode(&WebhookRecord {
            webhook_id: webhook_id.to_string(),
            processed_at: now,
        })?;
        let existing = Self::insert_unless_live::<WebhookRecord>(
            &self.webhooks,
            key.storage_key().as_bytes(),
            record,
            |r| is_live(r.processed_at, window, now),
        )?;
        Ok(existing.is_none())
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Self::sweep_tree::<WebhookRecord>(&self.webhooks, cutoff, |r| r.processed_at)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.webhooks.len())
    }
}

#[async_trait]
impl AlertIncidentIndex for SledIdempotencyStore {
    async fn incident_for(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        let retention = self.windows.link_retention;
        let link = Self::live_or_evict::<AlertIncidentLink>(
            &self.links,
            key.storage_key().as_bytes(),
            |l| retention.is_live(l.linked_at, now),
        )?;
        Ok(link.map(|l| l.incident_id))
    }

    async fn associate(&self, key: &AlertKey, incident_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let link = Self::encode(&AlertIncidentLink {
            incident_id,
            linked_at: now,
        })?;
        self.links.insert(key.storage_key().as_bytes(), link)?;
        Ok(())
    }

    async fn claim(
        &self,
        key: &AlertKey,
        incident_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let retention = self.windows.link_retention;
        let link = Self::encode(&AlertIncidentLink {
            incident_id,
            linked_at: now,
        })?;
        let existing = Self::insert_unless_live::<AlertIncidentLink>(
            &self.links,
            key.storage_key().as_bytes(),
            link,
            |l| retention.is_live(l.linked_at, now),
        )?;
        Ok(existing.map(|l| l.incident_id))
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        match self.windows.link_retention {
            LinkRetention::Permanent => Ok(0),
            LinkRetention::Expire { ttl } => {
                Self::sweep_tree::<AlertIncidentLink>(&self.links, now - ttl, |l| l.linked_at)
            }
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.links.len())
    }
}

#[async_trait]
impl NotificationGate for SledIdempotencyStore {
    async fn should_notify(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.notification;
        let live = Self::live_or_evict::<NotificationMark>(
            &self.notifications,
            incident_id.as_bytes(),
            |m| is_live(m.last_sent_at, window, now),
        )?;
        Ok(live.is_none())
    }

    async fn mark_sent(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<()> {
        let mark = Self::encode(&NotificationMark { last_sent_at: now })?;
        self.notifications.insert(incident_id.as_bytes(), mark)?;
        Ok(())
    }

    async fn try_acquire(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<bool> {
        let window = self.windows.notification;
        let mark = Self::encode(&NotificationMark { last_sent_at: now })?;
        let existing = Self::insert_unless_live::<NotificationMark>(
            &self.notifications,
            incident_id.as_bytes(),
            mark,
            |m| is_live(m.last_sent_at, window, now),
        )?;
        Ok(existing.is_none())
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Self::sweep_tree::<NotificationMark>(&self.notifications, cutoff, |m| m.last_sent_at)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.notifications.len())
    }
}
