pub mod config;
pub mod crm;
pub mod domain;
pub mod errors;
pub mod fields;
pub mod required;

pub use crm::CrmAdapter;
pub use domain::call::{
    CallDirection, CallOutcome, CallResultPayload, CallStartPayload, InboundCallLogPayload,
};
pub use domain::contact::{CallbackPreference, ContactInfo, UpdateContactPayload};
pub use domain::email::{EmailAddress, EmailAddressError};
pub use domain::invoice::{InvoiceInfo, ResendInvoicePayload, DEFAULT_REQUESTED_BY};
pub use errors::{
    ApplicationError, DomainError, FieldViolation, InterfaceError, LocSegment, ValidationError,
    ViolationKind,
};
pub use fields::{present_fields, FieldMap, FieldsError};
pub use required::RequiredFields;
