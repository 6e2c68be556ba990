use crate::config::{IdempotencyConfig, StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{
    AlertIncidentIndex, DedupStore, IdempotencyStats, InMemoryIdempotencyStore,
    NotificationGate, SledIdempotencyStore, Windows,
};
use std::sync::Arc;

/// The three idempotency contracts as handed to the engine and the sweeper
#[derive(Clone)]
pub struct IdempotencyStores {
    pub dedup: Arc<dyn DedupStore>,
    pub links: Arc<dyn AlertIncidentIndex>,
    pub notifications: Arc<dyn NotificationGate>,
}

impl IdempotencyStores {
    /// Use one backend value for all three contracts
    pub fn from_backend<S>(store: S) -> Self
    where
        S: DedupStore + AlertIncidentIndex + NotificationGate + 'static,
    {
        let store = Arc::new(store);
        Self {
            dedup: store.clone(),
            links: store.clone(),
            notifications: store,
        }
    }

    /// Snapshot of live entry counts
    pub async fn stats(&self) -> Result<IdempotencyStats> {
        Ok(IdempotencyStats {
            processed_webhooks: self.dedup.len().await?,
            active_notifications: self.notifications.len().await?,
            alert_to_incident_mappings: self.links.len().await?,
        })
    }
}

/// Create the idempotency stores based on configuration
pub fn create_stores(
    config: &StateConfig,
    idempotency: &IdempotencyConfig,
) -> Result<IdempotencyStores> {
    let windows = Windows::from_config(idempotency);

    match config.backend {
        StateBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled idempotency backend");

            let store = SledIdempotencyStore::new(path, windows)?;
            Ok(IdempotencyStores::from_backend(store))
        }

        StateBackend::Memory => Ok(create_in_memory_stores(windows)),
    }
}

/// Create in-memory stores (default backend, also used by tests)
pub fn create_in_memory_stores(windows: Windows) -> IdempotencyStores {
    tracing::info!("Initializing in-memory idempotency backend");
    IdempotencyStores::from_backend(InMemoryIdempotencyStore::new(windows))
}
