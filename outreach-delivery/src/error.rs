//! Typed error handling for the send pipeline.
//!
//! Three categories matter to the worker loop:
//! - Precondition failures (missing records, already-sent campaign):
//!   fail the whole job before any recipient is contacted
//! - Per-recipient transport failures: recovered locally, the loop
//!   continues
//! - Structural failures (store errors mid-loop): fail the job,
//!   keeping the outcome records already written

use outreach_core::{store::StoreError, transport::TransportError};
use thiserror::Error;

/// Record kinds a job can fail to hydrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Campaign,
    Tenant,
    Template,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Campaign => write!(f, "Campaign"),
            Self::Tenant => write!(f, "Tenant"),
            Self::Template => write!(f, "Template"),
        }
    }
}

/// Top-level pipeline error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A record required to process the job does not exist. Fatal to
    /// the whole job; no recipient is contacted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// The campaign was already sent; a job never resurrects it.
    #[error("Campaign already sent: {0}")]
    CampaignAlreadySent(String),

    /// The transport rejected a single recipient's message. Recovered
    /// locally; never fails the job.
    #[error("Transport failure for {recipient}: {source}")]
    Transport {
        recipient: String,
        #[source]
        source: TransportError,
    },

    /// The record store failed mid-pipeline. Structural; fails the job.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Queue interaction failed. Structural; fails the job.
    #[error("Queue error: {0}")]
    Queue(#[from] outreach_queue::QueueError),
}

impl DeliveryError {
    /// `true` for failures that abort a job before any recipient work.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::CampaignAlreadySent(_))
    }
}
