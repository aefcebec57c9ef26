//! Record-store seam for the relational backend.
//!
//! The delivery core only needs a handful of operations from the store:
//! lookup-by-id for campaigns, tenants, and templates, tenant-scoped
//! patient listing, campaign updates, and outcome inserts. The real
//! backend lives outside this repository; [`MemoryStore`] backs tests
//! and the development binary.

use std::sync::RwLock;

use ahash::AHashMap;
use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Campaign, DeliveryOutcome, Patient, Template, Tenant};

/// Errors surfaced by a record store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write targeted a record that does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Backend-specific failure (connection, lock poisoning, etc.).
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Read/write operations the delivery core requires from the
/// relational backend.
///
/// Campaign updates are last-writer-wins; the excluded HTTP layer may
/// read and write the same rows concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    async fn campaign(&self, id: &str) -> Result<Option<Campaign>>;

    async fn tenant(&self, id: &str) -> Result<Option<Tenant>>;

    async fn template(&self, id: &str) -> Result<Option<Template>>;

    /// All patients belonging to a tenant, in insertion order. Consent
    /// filtering is the audience selector's responsibility.
    async fn patients(&self, tenant_id: &str) -> Result<Vec<Patient>>;

    /// Persist campaign fields mutated by the pipeline (status,
    /// counters, timestamps).
    ///
    /// # Errors
    /// `NotFound` if the campaign row no longer exists.
    async fn update_campaign(&self, campaign: &Campaign) -> Result<()>;

    /// Insert one delivery-analytics record. Records are append-only
    /// from the core's perspective.
    async fn insert_outcome(&self, outcome: DeliveryOutcome) -> Result<()>;

    /// All outcome records for a campaign, in insertion order.
    async fn outcomes(&self, campaign_id: &str) -> Result<Vec<DeliveryOutcome>>;
}

#[derive(Debug, Default)]
struct Tables {
    tenants: AHashMap<String, Tenant>,
    campaigns: AHashMap<String, Campaign>,
    templates: AHashMap<String, Template>,
    // Vec keeps patient insertion order, which defines recipient order
    patients: Vec<Patient>,
    outcomes: Vec<DeliveryOutcome>,
}

/// In-memory record store for tests and development.
///
/// A `HashMap`-per-table design behind a single `RwLock`; campaign
/// updates overwrite whole rows (last-writer-wins, matching the
/// consistency the real backend offers the pipeline).
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tenant row.
    ///
    /// # Panics
    /// Panics if the table lock is poisoned.
    pub fn insert_tenant(&self, tenant: Tenant) {
        self.write().tenants.insert(tenant.id.clone(), tenant);
    }

    /// Seed a campaign row.
    ///
    /// # Panics
    /// Panics if the table lock is poisoned.
    pub fn insert_campaign(&self, campaign: Campaign) {
        self.write().campaigns.insert(campaign.id.clone(), campaign);
    }

    /// Seed a template row.
    ///
    /// # Panics
    /// Panics if the table lock is poisoned.
    pub fn insert_template(&self, template: Template) {
        self.write().templates.insert(template.id.clone(), template);
    }

    /// Seed a patient row.
    ///
    /// # Panics
    /// Panics if the table lock is poisoned.
    pub fn insert_patient(&self, patient: Patient) {
        self.write().patients.push(patient);
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn campaign(&self, id: &str) -> Result<Option<Campaign>> {
        Ok(self.tables.read()?.campaigns.get(id).cloned())
    }

    async fn tenant(&self, id: &str) -> Result<Option<Tenant>> {
        Ok(self.tables.read()?.tenants.get(id).cloned())
    }

    async fn template(&self, id: &str) -> Result<Option<Template>> {
        Ok(self.tables.read()?.templates.get(id).cloned())
    }

    async fn patients(&self, tenant_id: &str) -> Result<Vec<Patient>> {
        Ok(self
            .tables
            .read()?
            .patients
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<()> {
        let mut tables = self.tables.write()?;
        if tables.campaigns.contains_key(&campaign.id) {
            tables
                .campaigns
                .insert(campaign.id.clone(), campaign.clone());
            Ok(())
        } else {
            Err(StoreError::NotFound(campaign.id.clone()))
        }
    }

    async fn insert_outcome(&self, outcome: DeliveryOutcome) -> Result<()> {
        self.tables.write()?.outcomes.push(outcome);
        Ok(())
    }

    async fn outcomes(&self, campaign_id: &str) -> Result<Vec<DeliveryOutcome>> {
        Ok(self
            .tables
            .read()?
            .outcomes
            .iter()
            .filter(|o| o.campaign_id == campaign_id)
            .cloned()
            .collect())
    }
}
