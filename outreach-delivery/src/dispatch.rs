//! Per-recipient dispatch through the email transport.

use outreach_core::{
    model::{Patient, Tenant},
    transport::{EmailTransport, OutboundEmail},
};

use crate::error::DeliveryError;

/// Build the outbound message and hand it to the transport.
///
/// Called once per recipient; a failure here is scoped to this one
/// recipient and must never abort the rest of the job.
///
/// # Errors
/// [`DeliveryError::Transport`] carrying the recipient address and the
/// provider's reason.
pub async fn dispatch(
    transport: &dyn EmailTransport,
    tenant: &Tenant,
    patient: &Patient,
    subject: &str,
    html_body: String,
) -> Result<(), DeliveryError> {
    let email = OutboundEmail {
        to: patient.email.clone(),
        sender_email: tenant.sender_email.clone(),
        sender_name: tenant.sender_name.clone(),
        subject: subject.to_string(),
        html_body,
    };

    transport
        .send(&email)
        .await
        .map_err(|source| DeliveryError::Transport {
            recipient: patient.email.clone(),
            source,
        })
}
