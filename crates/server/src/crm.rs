//! CRM adapter that records every forwarded event as a structured log line.
//!
//! Stands in for a real CRM client until one is wired up: the input
//! contracts are those of [`CrmAdapter`], so swapping this out for an
//! HTTP-backed client does not touch the routing layer.

use async_trait::async_trait;
use mainline_core::{CallStartPayload, CrmAdapter, EmailAddress, FieldMap};
use serde::Serialize;
use tracing::info;

#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingCrmAdapter;

#[async_trait]
impl CrmAdapter for LoggingCrmAdapter {
    async fn record_call_start(&self, task_id: &str, payload: &CallStartPayload) {
        info!(
            event_name = "crm.call_start.recorded",
            task_id = %task_id,
            payload = %render(payload),
            "call start forwarded to CRM"
        );
    }

    async fn record_call_result(&self, data: FieldMap) {
        info!(
            event_name = "crm.call_result.recorded",
            data = %render(&data),
            "call result forwarded to CRM"
        );
    }

    async fn resend_invoice(&self, invoice_number: &str, email: &EmailAddress) -> bool {
        info!(
            event_name = "crm.invoice.resend_requested",
            invoice_number = %invoice_number,
            email = %email,
            "invoice resend forwarded to CRM"
        );
        true
    }

    async fn update_contact(
        &self,
        account_id: Option<&str>,
        account_name: Option<&str>,
        new_contact: FieldMap,
    ) {
        info!(
            event_name = "crm.contact.updated",
            account = account_label(account_id, account_name),
            new_contact = %render(&new_contact),
            "contact update forwarded to CRM"
        );
    }

    async fn log_inbound_call(&self, data: FieldMap) {
        info!(
            event_name = "crm.inbound_call.logged",
            data = %render(&data),
            "inbound call log forwarded to CRM"
        );
    }
}

fn account_label<'a>(account_id: Option<&'a str>, account_name: Option<&'a str>) -> &'a str {
    account_id
        .filter(|value| !value.is_empty())
        .or(account_name.filter(|value| !value.is_empty()))
        .unwrap_or("unknown")
}

fn render<T>(value: &T) -> String
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value).unwrap_or_else(|error| format!("<unserializable: {error}>"))
}
