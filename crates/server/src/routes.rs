//! Voice-agent callback routes.
//!
//! - `POST /vapi/call-start`: record that a call session began
//! - `POST /vapi/call-result`: record a call outcome, plus any new contact
//! - `POST /vapi/resend-invoice`: ask the CRM to resend an invoice
//! - `POST /vapi/update-contact`: update the contact on an account
//! - `POST /vapi/inbound-log`: log an inbound call
//!
//! Each route validates its body, applies its business rule, then makes
//! exactly the forwarding calls listed above before acknowledging.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use mainline_core::{
    present_fields, ApplicationError, CallResultPayload, CallStartPayload, CrmAdapter,
    FieldsError, InboundCallLogPayload, ResendInvoicePayload, UpdateContactPayload,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::correlation::CorrelationId;
use crate::extract::{ApiError, ValidatedJson};

const RESEND_FAILED_DETAIL: &str = "Failed to resend invoice";

#[derive(Clone)]
pub struct VapiState {
    crm: Arc<dyn CrmAdapter>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub status: String,
}

impl Acknowledgement {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

type RouteResult = Result<Json<Acknowledgement>, ApiError>;

pub fn router(crm: Arc<dyn CrmAdapter>) -> Router {
    Router::new()
        .route("/vapi/call-start", post(call_start))
        .route("/vapi/call-result", post(call_result))
        .route("/vapi/resend-invoice", post(resend_invoice))
        .route("/vapi/update-contact", post(update_contact))
        .route("/vapi/inbound-log", post(inbound_log))
        .with_state(VapiState { crm })
}

async fn call_start(
    State(state): State<VapiState>,
    correlation_id: CorrelationId,
    ValidatedJson(payload): ValidatedJson<CallStartPayload>,
) -> RouteResult {
    state.crm.record_call_start(&payload.task_id, &payload).await;

    info!(
        event_name = "vapi.call_start.forwarded",
        correlation_id = %correlation_id,
        task_id = %payload.task_id,
        direction = payload.direction.as_str(),
        invoice_count = payload.invoices.len(),
        "call start forwarded"
    );
    Ok(Json(Acknowledgement::ok()))
}

async fn call_result(
    State(state): State<VapiState>,
    correlation_id: CorrelationId,
    ValidatedJson(payload): ValidatedJson<CallResultPayload>,
) -> RouteResult {
    // Both forwarded shapes are built before any CRM call is made.
    let new_contact = payload
        .new_contact
        .as_ref()
        .map(present_fields)
        .transpose()
        .map_err(|error| filter_failure(error, &correlation_id))?;
    let data = present_fields(&payload).map_err(|error| filter_failure(error, &correlation_id))?;

    let contact_updated = new_contact.is_some();
    if let Some(new_contact) = new_contact {
        state.crm.update_contact(None, None, new_contact).await;
    }
    state.crm.record_call_result(data).await;

    info!(
        event_name = "vapi.call_result.forwarded",
        correlation_id = %correlation_id,
        task_id = payload.task_id.as_deref().unwrap_or("unknown"),
        call_id = payload.call_id.as_deref().unwrap_or("unknown"),
        outcome = payload.outcome.as_str(),
        contact_updated,
        "call result forwarded"
    );
    Ok(Json(Acknowledgement::ok()))
}

async fn resend_invoice(
    State(state): State<VapiState>,
    correlation_id: CorrelationId,
    ValidatedJson(payload): ValidatedJson<ResendInvoicePayload>,
) -> RouteResult {
    let accepted = state.crm.resend_invoice(&payload.invoice_number, &payload.email).await;
    if !accepted {
        return Err(ApiError::from_application(
            ApplicationError::Dispatch(RESEND_FAILED_DETAIL.to_string()),
            &correlation_id,
        ));
    }

    info!(
        event_name = "vapi.resend_invoice.forwarded",
        correlation_id = %correlation_id,
        invoice_number = %payload.invoice_number,
        requested_by = payload.requested_by.as_deref().unwrap_or("unknown"),
        "invoice resend forwarded"
    );
    Ok(Json(Acknowledgement::ok()))
}

async fn update_contact(
    State(state): State<VapiState>,
    correlation_id: CorrelationId,
    ValidatedJson(payload): ValidatedJson<UpdateContactPayload>,
) -> RouteResult {
    let account = payload
        .require_account_identifier()
        .map_err(|error| ApiError::from_application(error.into(), &correlation_id))?
        .to_string();
    let new_contact = present_fields(&payload.new_contact)
        .map_err(|error| filter_failure(error, &correlation_id))?;

    state
        .crm
        .update_contact(payload.account_id.as_deref(), payload.account_name.as_deref(), new_contact)
        .await;

    info!(
        event_name = "vapi.update_contact.forwarded",
        correlation_id = %correlation_id,
        account = %account,
        "contact update forwarded"
    );
    Ok(Json(Acknowledgement::ok()))
}

async fn inbound_log(
    State(state): State<VapiState>,
    correlation_id: CorrelationId,
    ValidatedJson(payload): ValidatedJson<InboundCallLogPayload>,
) -> RouteResult {
    let data = present_fields(&payload).map_err(|error| filter_failure(error, &correlation_id))?;
    state.crm.log_inbound_call(data).await;

    info!(
        event_name = "vapi.inbound_log.forwarded",
        correlation_id = %correlation_id,
        invoice_count = payload.invoices.len(),
        "inbound call log forwarded"
    );
    Ok(Json(Acknowledgement::ok()))
}

fn filter_failure(error: FieldsError, correlation_id: &CorrelationId) -> ApiError {
    ApiError::from_application(ApplicationError::Internal(error.to_string()), correlation_id)
}
