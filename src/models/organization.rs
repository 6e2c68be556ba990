use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant owning services and receiving webhooks under its key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    pub id: Uuid,
    /// URL key used in `/inbound/<source>/<key>`
    pub organization_key: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(organization_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_key: organization_key.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Resolved service within an organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ServiceRef {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
}
