//! Fail-fast hydration of everything one job needs.

use outreach_core::{
    model::{Campaign, CampaignStatus, Template, Tenant},
    store::RecordStore,
};

use crate::error::{DeliveryError, Entity};

/// The records required to process one send job.
#[derive(Debug, Clone)]
pub struct CampaignContext {
    pub campaign: Campaign,
    pub tenant: Tenant,
    pub template: Template,
}

/// Fetch the campaign, its owning tenant, and its template.
///
/// This is a precondition check for the whole job: any missing record
/// aborts before a single recipient is considered, leaving the
/// campaign row untouched. A campaign that already reached `Sent` is
/// rejected the same way so a duplicate job can never double-send.
///
/// # Errors
/// [`DeliveryError::NotFound`] for a missing record,
/// [`DeliveryError::CampaignAlreadySent`] for a finished campaign.
pub async fn load_context(
    store: &dyn RecordStore,
    campaign_id: &str,
) -> Result<CampaignContext, DeliveryError> {
    let campaign =
        store
            .campaign(campaign_id)
            .await?
            .ok_or_else(|| DeliveryError::NotFound {
                entity: Entity::Campaign,
                id: campaign_id.to_string(),
            })?;

    if campaign.status == CampaignStatus::Sent {
        return Err(DeliveryError::CampaignAlreadySent(campaign.id));
    }

    let tenant = store
        .tenant(&campaign.tenant_id)
        .await?
        .ok_or_else(|| DeliveryError::NotFound {
            entity: Entity::Tenant,
            id: campaign.tenant_id.clone(),
        })?;

    let template =
        store
            .template(&campaign.template_id)
            .await?
            .ok_or_else(|| DeliveryError::NotFound {
                entity: Entity::Template,
                id: campaign.template_id.clone(),
            })?;

    Ok(CampaignContext {
        campaign,
        tenant,
        template,
    })
}
