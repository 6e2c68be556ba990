//! Organization lookup and service resolution.

use crate::config::OrganizationSeed;
use crate::error::{AppError, Result};
use crate::models::{Organization, ServiceRef};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait ServiceResolver: Send + Sync {
    /// Look up an organization by its webhook key
    async fn find_organization(&self, organization_key: &str) -> Result<Organization>;

    /// Resolve a service by name within an organization, creating it on first use
    async fn find_or_create_service(
        &self,
        service_name: &str,
        organization: &Organization,
    ) -> Result<ServiceRef>;

    async fn list_organizations(&self) -> Result<Vec<Organization>>;
}

/// Directory kept in process memory, seeded from configuration
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    organizations: Arc<DashMap<String, Organization>>,
    services: Arc<DashMap<(Uuid, String), ServiceRef>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organizations(seeds: &[OrganizationSeed]) -> Self {
        let directory = Self::new();
        for seed in seeds {
            directory.add_organization(Organization::new(&seed.key, &seed.name));
        }
        tracing::info!(count = seeds.len(), "Seeded organizations");
        directory
    }

    pub fn add_organization(&self, organization: Organization) {
        self.organizations
            .insert(organization.organization_key.clone(), organization);
    }
}

#[async_trait]
impl ServiceResolver for InMemoryDirectory {
    async fn find_organization(&self, organization_key: &str) -> Result<Organization> {
        self.organizations
            .get(organization_key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::NotFound(format!("Organization '{}' not found", organization_key))
            })
    }

    async fn find_or_create_service(
        &self,
        service_name: &str,
        organization: &Organization,
    ) -> Result<ServiceRef> {
        let name = service_name.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::Validation("service name is empty".to_string()));
        }

        let service = self
            .services
            .entry((organization.id, name.clone()))
            .or_insert_with(|| {
                tracing::info!(
                    service = %name,
                    organization = %organization.organization_key,
                    "Registered new service"
                );
                ServiceRef {
                    id: Uuid::new_v4(),
                    name: name.clone(),
                    organization_id: organization.id,
                }
            })
            .value()
            .clone();

        Ok(service)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut organizations: Vec<Organization> = self
            .organizations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        organizations.sort_by(|a, b| a.organization_key.cmp(&b.organization_key));
        Ok(organizations)
    }
}
