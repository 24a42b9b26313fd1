use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::email::EmailAddress;
use crate::errors::{DomainError, FieldViolation, LocSegment};
use crate::required::{missing_keys, RequiredFields};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<EmailAddress>,
    /// Free-form role label, e.g. `AP` or `Owner`.
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPreference {
    pub preferred_date: Option<NaiveDate>,
    /// Free text such as `9-11AM`.
    pub preferred_time_range: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateContactPayload {
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub new_contact: ContactInfo,
}

impl UpdateContactPayload {
    /// The identifier the CRM should resolve the account by. Empty strings do
    /// not identify an account.
    pub fn account_identifier(&self) -> Option<&str> {
        [self.account_id.as_deref(), self.account_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty())
    }

    pub fn require_account_identifier(&self) -> Result<&str, DomainError> {
        self.account_identifier().ok_or(DomainError::MissingAccountIdentifier)
    }
}

impl RequiredFields for UpdateContactPayload {
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation> {
        missing_keys(body, loc, &["new_contact"])
    }
}
