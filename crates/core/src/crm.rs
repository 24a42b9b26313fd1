//! Boundary to the downstream CRM.
//!
//! Every business event the voice agent reports is forwarded through exactly
//! one [`CrmAdapter`] operation. Implementations own all network concerns; the
//! routing layer only validates input and picks the operation.

use async_trait::async_trait;

use crate::domain::call::CallStartPayload;
use crate::domain::email::EmailAddress;
use crate::fields::FieldMap;

#[async_trait]
pub trait CrmAdapter: Send + Sync {
    /// Records that the agent has started a call session.
    async fn record_call_start(&self, task_id: &str, payload: &CallStartPayload);

    /// Records the outcome of a finished call. `data` only holds supplied fields.
    async fn record_call_result(&self, data: FieldMap);

    /// Asks the CRM to send the invoice again. Returns `false` when the
    /// dispatch was not accepted.
    async fn resend_invoice(&self, invoice_number: &str, email: &EmailAddress) -> bool;

    /// Updates the contact on an account. At most one identifier is
    /// meaningful; both are `None` when the contact came from a call result.
    async fn update_contact(
        &self,
        account_id: Option<&str>,
        account_name: Option<&str>,
        new_contact: FieldMap,
    );

    async fn log_inbound_call(&self, data: FieldMap);
}
