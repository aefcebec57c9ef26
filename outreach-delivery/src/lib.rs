//! The campaign send pipeline.
//!
//! This crate turns a claimed send job into per-recipient deliveries:
//! - Hydrate the campaign, tenant, and template (fail fast if missing)
//! - Select the consented, targeted patient audience
//! - Personalize and render content per patient
//! - Dispatch through the email transport, isolating per-recipient
//!   failures
//! - Record one delivery outcome per recipient per attempt and
//!   finalize the campaign
//!
//! The [`Worker`] drives all of this from a periodic polling loop,
//! claiming at most one job per tick.

pub mod audience;
pub mod context;
pub mod dispatch;
mod error;
pub mod outcome;
pub mod personalize;
mod processor;
pub mod render;

pub use context::{CampaignContext, load_context};
pub use error::{DeliveryError, Entity};
pub use processor::{Worker, WorkerConfig};
