use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::email::EmailAddress;
use crate::errors::{FieldViolation, LocSegment};
use crate::required::{missing_keys, RequiredFields};

/// Caller name recorded when a resend request does not say who asked for it.
pub const DEFAULT_REQUESTED_BY: &str = "vapi";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceInfo {
    pub invoice_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub days_overdue: Option<u32>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendInvoicePayload {
    pub invoice_number: String,
    pub email: EmailAddress,
    #[serde(default = "default_requested_by")]
    pub requested_by: Option<String>,
}

fn default_requested_by() -> Option<String> {
    Some(DEFAULT_REQUESTED_BY.to_string())
}

impl RequiredFields for InvoiceInfo {
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation> {
        missing_keys(body, loc, &["invoice_number", "amount"])
    }
}

impl RequiredFields for ResendInvoicePayload {
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation> {
        missing_keys(body, loc, &["invoice_number", "email"])
    }
}
