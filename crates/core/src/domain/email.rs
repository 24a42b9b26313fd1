use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A syntactically valid email address.
///
/// Only the shape is checked: a non-empty local part, a single `@`, and a
/// dotted domain without empty labels. Deliverability is the CRM's concern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmailAddressError {
    #[error("value is not a valid email address: the address is empty")]
    Empty,
    #[error("value is not a valid email address: it must not contain whitespace")]
    Whitespace,
    #[error("value is not a valid email address: it must contain exactly one @-sign")]
    AtSign,
    #[error("value is not a valid email address: there must be something before the @-sign")]
    EmptyLocalPart,
    #[error("value is not a valid email address: the part after the @-sign is not a valid domain")]
    InvalidDomain,
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s").expect("whitespace pattern compiles"));

/// Splits on the only `@`; fails when there are zero or several.
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<local>[^@]*)@(?P<domain>[^@]*)$").expect("address pattern compiles")
});

/// Two or more non-empty dot-separated labels.
static DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^.]+(\.[^.]+)+$").expect("domain pattern compiles"));

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, EmailAddressError> {
        let candidate = raw.trim();
        if candidate.is_empty() {
            return Err(EmailAddressError::Empty);
        }
        if WHITESPACE.is_match(candidate) {
            return Err(EmailAddressError::Whitespace);
        }

        let parts = ADDRESS.captures(candidate).ok_or(EmailAddressError::AtSign)?;
        let local = parts.name("local").map_or("", |part| part.as_str());
        let domain = parts.name("domain").map_or("", |part| part.as_str());

        if local.is_empty() {
            return Err(EmailAddressError::EmptyLocalPart);
        }
        if !DOMAIN.is_match(domain) {
            return Err(EmailAddressError::InvalidDomain);
        }

        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EmailAddress {
    type Err = EmailAddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
