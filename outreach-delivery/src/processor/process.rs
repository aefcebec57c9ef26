//! Driving one claimed job through the full pipeline.

use chrono::Utc;
use outreach_core::model::Patient;
use outreach_queue::{CompletionSummary, Job};
use tracing::{error, warn};

use crate::{
    audience::select_recipients,
    context::{CampaignContext, load_context},
    dispatch::dispatch,
    error::DeliveryError,
    outcome::{finalize_campaign, record_outcome},
    personalize::personalize,
    render::render_body,
};

use super::Worker;

/// Progress after `done` of `total` recipients: round(done/total*100),
/// never above 100.
fn progress_for(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (done * 200 + total) / (2 * total);
    u8::try_from(percent).map_or(100, |p| p.min(100))
}

/// Process a claimed job and reconcile its terminal state with the
/// queue. Only queue faults escape; pipeline failures land in the
/// failed list with their reason.
pub(super) async fn process_job(worker: &Worker, job: Job) -> Result<(), DeliveryError> {
    let mut sent = 0;
    let mut errors = 0;

    match run(worker, &job, &mut sent, &mut errors).await {
        Ok(summary) => worker.queue.release_completed(&job.id, summary).await?,
        Err(err) => {
            error!(job_id = %job.id, "Job failed: {err}");
            worker.queue.release_failed(&job.id, err.to_string()).await?;
        }
    }

    Ok(())
}

async fn run(
    worker: &Worker,
    job: &Job,
    sent: &mut u32,
    errors: &mut u32,
) -> Result<CompletionSummary, DeliveryError> {
    let store = worker.store.as_ref();

    // Precondition checks: nothing below runs and the campaign row is
    // untouched if any record is missing.
    let mut ctx = load_context(store, &job.payload.campaign_id).await?;
    let prior_status = ctx.campaign.status;
    let prior_target_count = ctx.campaign.target_count;

    let recipients = select_recipients(store, &mut ctx).await?;
    let total = recipients.len();

    if let Err(err) = deliver_all(worker, job, &ctx, &recipients, sent, errors).await {
        // Structural failure mid-loop. Outcome records already written
        // stay in place. If nothing went out, undo the `Sending`
        // transition so the campaign does not sit stuck forever.
        if *sent == 0 {
            ctx.campaign.status = prior_status;
            ctx.campaign.target_count = prior_target_count;
            if let Err(undo) = store.update_campaign(&ctx.campaign).await {
                warn!(
                    campaign_id = %ctx.campaign.id,
                    "Failed to roll back campaign status: {undo}"
                );
            }
        }
        return Err(err);
    }

    finalize_campaign(store, &mut ctx.campaign, *sent).await?;

    Ok(CompletionSummary::new(
        u32::try_from(total).unwrap_or(u32::MAX),
        *sent,
        *errors,
    ))
}

async fn deliver_all(
    worker: &Worker,
    job: &Job,
    ctx: &CampaignContext,
    recipients: &[Patient],
    sent: &mut u32,
    errors: &mut u32,
) -> Result<(), DeliveryError> {
    let store = worker.store.as_ref();
    let total = recipients.len();
    let today = Utc::now().date_naive();

    for (index, patient) in recipients.iter().enumerate() {
        let blocks = personalize(&ctx.template.blocks, patient, today);
        let body = render_body(&blocks);

        match dispatch(
            worker.transport.as_ref(),
            &ctx.tenant,
            patient,
            &ctx.campaign.subject,
            body,
        )
        .await
        {
            Ok(()) => {
                record_outcome(store, &ctx.campaign.id, &patient.id, &job.id, true, None).await?;
                *sent += 1;
            }
            Err(DeliveryError::Transport { recipient, source }) => {
                // One recipient's failure never aborts the rest
                warn!(job_id = %job.id, %recipient, "Send failed: {source}");
                record_outcome(
                    store,
                    &ctx.campaign.id,
                    &patient.id,
                    &job.id,
                    false,
                    Some(source.to_string()),
                )
                .await?;
                *errors += 1;
            }
            Err(structural) => return Err(structural),
        }

        worker
            .queue
            .set_progress(&job.id, progress_for(index + 1, total))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_rounds_to_nearest_percent() {
        assert_eq!(progress_for(0, 10), 0);
        assert_eq!(progress_for(3, 10), 30);
        assert_eq!(progress_for(10, 10), 100);

        // round(1/3*100) = 33, round(2/3*100) = 67
        assert_eq!(progress_for(1, 3), 33);
        assert_eq!(progress_for(2, 3), 67);

        assert_eq!(progress_for(0, 0), 100);
    }

    #[test]
    fn test_progress_is_nondecreasing_over_a_run() {
        let total = 10;
        let mut last = 0;
        for done in 0..=total {
            let progress = progress_for(done, total);
            assert!(progress >= last);
            last = progress;
        }
        assert_eq!(last, 100);
    }
}
