//! Idempotency state: the Dedup Store, the Alert-Incident Index and the
//! Notification Gate.
//!
//! All three share the same shape: a keyed record stamped with the time it was
//! written, considered live while its age is below a window. An expired record
//! is treated as absent on the next read and evicted as a side effect of that
//! read. Every contract also offers a single atomic check-and-mark primitive
//! (`try_mark`, `claim`, `try_acquire`) so concurrent callers for the same key
//! cannot both win.

pub mod factory;
pub mod sled_store;
pub mod store;

pub use factory::{create_in_memory_stores, create_stores, IdempotencyStores};
pub use sled_store::SledIdempotencyStore;
pub use store::InMemoryIdempotencyStore;

use crate::config::{IdempotencyConfig, LinkRetentionPolicy};
use crate::error::Result;
use crate::models::AlertKey;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-windowed record of webhooks already handled
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// True when no live record exists for `key`. An expired record is evicted.
    async fn should_process(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<bool>;

    /// Insert or overwrite the record for `key` with `processed_at = now`
    async fn mark_processed(&self, key: &AlertKey, webhook_id: &str, now: DateTime<Utc>)
        -> Result<()>;

    /// Check and mark in one step. Returns true iff this caller should process.
    async fn try_mark(&self, key: &AlertKey, webhook_id: &str, now: DateTime<Utc>)
        -> Result<bool>;

    /// Remove records processed before `cutoff`, returning how many went
    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}

/// Mapping from alert identity to the incident it produced
#[async_trait]
pub trait AlertIncidentIndex: Send + Sync {
    async fn incident_for(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<Option<Uuid>>;

    async fn has_incident(&self, key: &AlertKey, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.incident_for(key, now).await?.is_some())
    }

    /// Set the link, last write wins
    async fn associate(&self, key: &AlertKey, incident_id: Uuid, now: DateTime<Utc>)
        -> Result<()>;

    /// Insert the link unless a live one exists.
    ///
    /// Returns `None` when the caller now owns the link, or the incident id
    /// already linked to `key`.
    async fn claim(&self, key: &AlertKey, incident_id: Uuid, now: DateTime<Utc>)
        -> Result<Option<Uuid>>;

    /// Remove links that outlived the retention policy. No-op when permanent.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}

/// Per-incident suppression of repeated notifications
#[async_trait]
pub trait NotificationGate: Send + Sync {
    /// True when no live mark exists for the incident. An expired mark is evicted.
    async fn should_notify(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<bool>;

    async fn mark_sent(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Check and mark in one step. Returns true iff this caller may notify.
    async fn try_acquire(&self, incident_id: &Uuid, now: DateTime<Utc>) -> Result<bool>;

    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}

/// Lifetime of alert-to-incident links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRetention {
    /// Links live until explicitly removed
    #[default]
    Permanent,
    /// Links older than `ttl` count as absent and are swept
    Expire { ttl: Duration },
}

impl LinkRetention {
    pub fn is_live(&self, linked_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            LinkRetention::Permanent => true,
            LinkRetention::Expire { ttl } => now - linked_at < *ttl,
        }
    }
}

/// Windows shared by every backend
#[derive(Debug, Clone, Copy)]
pub struct Windows {
    pub dedup: Duration,
    pub notification: Duration,
    pub link_retention: LinkRetention,
}

impl Windows {
    pub fn from_config(config: &IdempotencyConfig) -> Self {
        let link_retention = match config.link_retention.policy {
            LinkRetentionPolicy::Permanent => LinkRetention::Permanent,
            LinkRetentionPolicy::Expire => LinkRetention::Expire {
                ttl: Duration::seconds(config.link_retention.ttl_secs as i64),
            },
        };

        Self {
            dedup: config.dedup_window(),
            notification: config.notification_window(),
            link_retention,
        }
    }
}

impl Default for Windows {
    fn default() -> Self {
        Self::from_config(&IdempotencyConfig::default())
    }
}

/// Records are live while `now - stamp < window`
pub(crate) fn is_live(stamp: DateTime<Utc>, window: Duration, now: DateTime<Utc>) -> bool {
    now - stamp < window
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookRecord {
    pub webhook_id: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertIncidentLink {
    pub incident_id: Uuid,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NotificationMark {
    pub last_sent_at: DateTime<Utc>,
}

/// Read-only snapshot of store sizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IdempotencyStats {
    pub processed_webhooks: usize,
    pub active_notifications: usize,
    pub alert_to_incident_mappings: usize,
}
