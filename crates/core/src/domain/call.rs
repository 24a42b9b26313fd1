use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::contact::{CallbackPreference, ContactInfo};
use crate::domain::email::EmailAddress;
use crate::domain::invoice::InvoiceInfo;
use crate::errors::{FieldViolation, LocSegment};
use crate::fields::FieldMap;
use crate::required::{missing_in_list, missing_keys, RequiredFields};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    #[default]
    Outbound,
    Inbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outbound => "outbound",
            Self::Inbound => "inbound",
        }
    }
}

/// How a collections call ended, as classified by the voice agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    ConnectedRightPerson,
    ConnectedWrongPerson,
    NoAnswer,
    VoicemailLeft,
    PromiseToPay,
    Dispute,
    NeedsInvoiceResent,
    CallbackRequested,
    RefusedToPay,
    Other,
}

impl CallOutcome {
    pub const ALL: [CallOutcome; 10] = [
        Self::ConnectedRightPerson,
        Self::ConnectedWrongPerson,
        Self::NoAnswer,
        Self::VoicemailLeft,
        Self::PromiseToPay,
        Self::Dispute,
        Self::NeedsInvoiceResent,
        Self::CallbackRequested,
        Self::RefusedToPay,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectedRightPerson => "connected_right_person",
            Self::ConnectedWrongPerson => "connected_wrong_person",
            Self::NoAnswer => "no_answer",
            Self::VoicemailLeft => "voicemail_left",
            Self::PromiseToPay => "promise_to_pay",
            Self::Dispute => "dispute",
            Self::NeedsInvoiceResent => "needs_invoice_resent",
            Self::CallbackRequested => "callback_requested",
            Self::RefusedToPay => "refused_to_pay",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStartPayload {
    /// Voice-platform identifier of the call session.
    pub task_id: String,
    #[serde(default)]
    pub direction: CallDirection,
    pub to_phone: String,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub contact: Option<ContactInfo>,
    #[serde(default)]
    pub invoices: Vec<InvoiceInfo>,
    #[serde(default)]
    pub metadata: FieldMap,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResultPayload {
    pub task_id: Option<String>,
    pub call_id: Option<String>,
    #[serde(default)]
    pub direction: CallDirection,

    pub outcome: CallOutcome,
    pub outcome_detail: Option<String>,

    #[serde(default)]
    pub invoices: Vec<InvoiceInfo>,
    pub promise_date: Option<NaiveDate>,
    pub expected_payment_method: Option<String>,

    pub reason: Option<String>,

    pub confirmed_email: Option<EmailAddress>,
    pub new_contact: Option<ContactInfo>,
    #[serde(default)]
    pub transfer_to_accounting: bool,

    pub callback_preference: Option<CallbackPreference>,

    #[serde(default)]
    pub voicemail_left: bool,

    pub notes: Option<String>,
    /// Unstructured platform data forwarded untouched.
    pub raw: Option<FieldMap>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCallLogPayload {
    pub from_phone: String,
    pub reason: Option<String>,
    #[serde(default)]
    pub invoices: Vec<InvoiceInfo>,
    pub callback_preference: Option<CallbackPreference>,
    pub notes: Option<String>,
}

impl RequiredFields for CallStartPayload {
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation> {
        let mut missing = missing_keys(body, loc, &["task_id", "to_phone"]);
        missing.extend(missing_in_list::<InvoiceInfo>(body, loc, "invoices"));
        missing
    }
}

impl RequiredFields for CallResultPayload {
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation> {
        let mut missing = missing_keys(body, loc, &["outcome"]);
        missing.extend(missing_in_list::<InvoiceInfo>(body, loc, "invoices"));
        missing
    }
}

impl RequiredFields for InboundCallLogPayload {
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation> {
        let mut missing = missing_keys(body, loc, &["from_phone"]);
        missing.extend(missing_in_list::<InvoiceInfo>(body, loc, "invoices"));
        missing
    }
}
