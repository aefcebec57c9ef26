//! Audience selection: which patients a campaign is allowed to reach.

use outreach_core::{
    internal,
    model::{CampaignStatus, ConsentStatus, Patient},
    store::RecordStore,
};

use crate::{context::CampaignContext, error::DeliveryError};

/// Select the recipients for this send and move the campaign into
/// `Sending`.
///
/// Consent is a hard gate applied before targeting: only patients with
/// [`ConsentStatus::Active`] are ever considered, regardless of how the
/// template targets. On top of that, empty targeting criteria mean a
/// broadcast to every consented patient, while non-empty criteria keep
/// only patients matching at least one entry.
///
/// The campaign's `target_count` is set to the audience size before the
/// first dispatch so progress reporting has a stable denominator.
///
/// # Errors
/// Propagates store failures. A store error here fails the job before
/// any recipient is contacted.
pub async fn select_recipients(
    store: &dyn RecordStore,
    ctx: &mut CampaignContext,
) -> Result<Vec<Patient>, DeliveryError> {
    let patients = store.patients(&ctx.campaign.tenant_id).await?;
    let considered = patients.len();

    let recipients: Vec<Patient> = patients
        .into_iter()
        .filter(|p| p.consent == ConsentStatus::Active)
        .filter(|p| ctx.template.targeting.is_empty() || ctx.template.targeting.matches(p))
        .collect();

    internal!(
        level = DEBUG,
        "Campaign {}: {} recipients selected of {} patients",
        ctx.campaign.id,
        recipients.len(),
        considered
    );

    ctx.campaign.status = CampaignStatus::Sending;
    ctx.campaign.target_count = u32::try_from(recipients.len()).unwrap_or(u32::MAX);
    store.update_campaign(&ctx.campaign).await?;

    Ok(recipients)
}
