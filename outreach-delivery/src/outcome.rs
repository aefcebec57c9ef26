//! Delivery-analytics records and campaign finalization.

use std::time::{SystemTime, UNIX_EPOCH};

use outreach_core::{
    model::{Campaign, CampaignStatus, DeliveryOutcome},
    store::RecordStore,
};
use outreach_queue::JobId;

use crate::error::DeliveryError;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Write the single analytics record for one recipient attempt.
///
/// Exactly one record exists per patient per job attempt, whether the
/// send succeeded or not, so "attempted but failed" stays
/// distinguishable from "never attempted".
///
/// # Errors
/// Propagates store failures; the caller treats these as structural.
pub async fn record_outcome(
    store: &dyn RecordStore,
    campaign_id: &str,
    patient_id: &str,
    job_id: &JobId,
    sent: bool,
    error: Option<String>,
) -> Result<(), DeliveryError> {
    store
        .insert_outcome(DeliveryOutcome {
            campaign_id: campaign_id.to_string(),
            patient_id: patient_id.to_string(),
            job_id: job_id.to_string(),
            sent,
            delivered: sent,
            opened: false,
            error,
            recorded_at: unix_now(),
        })
        .await?;
    Ok(())
}

/// Move the campaign to `Sent` after the full recipient loop settles.
///
/// Runs exactly once per job, never incrementally, and records the
/// actual successful-send count along with the sent timestamp.
///
/// # Errors
/// Propagates store failures.
pub async fn finalize_campaign(
    store: &dyn RecordStore,
    campaign: &mut Campaign,
    sent_count: u32,
) -> Result<(), DeliveryError> {
    campaign.status = CampaignStatus::Sent;
    campaign.sent_count = sent_count;
    campaign.sent_at = Some(unix_now());
    store.update_campaign(campaign).await?;
    Ok(())
}
