use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// One segment of the path to a failing field, e.g. `["body", "invoices", 0, "amount"]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for LocSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<usize> for LocSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    ValueError,
    Enum,
    TypeError,
    JsonInvalid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub loc: Vec<LocSegment>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: ViolationKind,
}

impl FieldViolation {
    pub fn path(&self) -> String {
        self.loc.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("request failed schema validation at {}", describe(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn describe(violations: &[FieldViolation]) -> String {
    violations.iter().map(FieldViolation::path).collect::<Vec<_>>().join(", ")
}

impl ValidationError {
    pub fn single(violation: FieldViolation) -> Self {
        Self { violations: vec![violation] }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("missing account identifier")]
    MissingAccountIdentifier,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("dispatch failure: {0}")]
    Dispatch(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("unprocessable request: {} violation(s)", .violations.len())]
    Unprocessable { violations: Vec<FieldViolation>, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Unprocessable { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Validation(ValidationError { violations }) => {
                Self::Unprocessable { violations, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Domain(DomainError::MissingAccountIdentifier) => Self::BadRequest {
                message: "Missing account identifier".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Dispatch(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Internal(_) => Self::Internal {
                message: "Internal server error".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}
