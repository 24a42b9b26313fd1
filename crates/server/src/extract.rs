//! Request body validation and the error responses every route shares.
//!
//! Response shapes:
//! - 422 `{"detail":[{"loc":["body", ...],"msg":"...","type":"..."}]}`
//! - 400 / 500 `{"detail":"..."}`

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mainline_core::{
    ApplicationError, FieldViolation, InterfaceError, LocSegment, RequiredFields, ValidationError,
    ViolationKind,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use serde_path_to_error::Segment;
use tracing::{error, warn};

use crate::correlation::CorrelationId;

/// JSON body deserialized into `T`, or a 422 naming the failing fields.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + RequiredFields,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = request
            .extensions()
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(CorrelationId::generate);

        let Json(body) = match Json::<Value>::from_request(request, state).await {
            Ok(body) => body,
            Err(rejection) => return Err(reject_body(rejection, &correlation_id)),
        };

        match serde_path_to_error::deserialize::<_, T>(&body) {
            Ok(value) => Ok(Self(value)),
            Err(error) => {
                let violations = collect_violations::<T>(&body, violation_from(&error));
                Err(ApiError::from_application(
                    ValidationError { violations }.into(),
                    &correlation_id,
                )
                .into_response())
            }
        }
    }
}

/// The deserialization failure plus every other absent required field.
fn collect_violations<T: RequiredFields>(
    body: &Value,
    first: FieldViolation,
) -> Vec<FieldViolation> {
    let missing = T::missing_fields(body, &[LocSegment::from("body")]);
    if first.kind == ViolationKind::Missing && missing.contains(&first) {
        return missing;
    }

    let mut violations = vec![first];
    for violation in missing {
        if !violations.contains(&violation) {
            violations.push(violation);
        }
    }
    violations
}

fn reject_body(rejection: JsonRejection, correlation_id: &CorrelationId) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(
            event_name = "vapi.request.body_too_large",
            correlation_id = %correlation_id,
            "request body exceeded the configured limit"
        );
        return rejection.into_response();
    }

    let violation = FieldViolation {
        loc: vec![LocSegment::from("body")],
        msg: rejection.body_text(),
        kind: ViolationKind::JsonInvalid,
    };
    ApiError::from_application(ValidationError::single(violation).into(), correlation_id)
        .into_response()
}

fn violation_from(error: &serde_path_to_error::Error<serde_json::Error>) -> FieldViolation {
    let mut loc = vec![LocSegment::from("body")];
    for segment in error.path().iter() {
        match segment {
            Segment::Seq { index } => loc.push(LocSegment::Index(*index)),
            Segment::Map { key } => loc.push(LocSegment::Key(key.clone())),
            Segment::Enum { variant } => loc.push(LocSegment::Key(variant.clone())),
            Segment::Unknown => {}
        }
    }

    let msg = error.inner().to_string();
    let kind = classify(&msg);
    if kind == ViolationKind::Missing {
        if let Some(field) = missing_field_name(&msg) {
            loc.push(LocSegment::from(field));
        }
    }

    FieldViolation { loc, msg, kind }
}

fn classify(message: &str) -> ViolationKind {
    if message.starts_with("missing field") {
        ViolationKind::Missing
    } else if message.starts_with("unknown variant") {
        ViolationKind::Enum
    } else if message.starts_with("invalid type") {
        ViolationKind::TypeError
    } else {
        ViolationKind::ValueError
    }
}

// serde reports missing fields as "missing field `name`".
fn missing_field_name(message: &str) -> Option<&str> {
    message.strip_prefix("missing field `")?.split('`').next().filter(|name| !name.is_empty())
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

#[derive(Serialize)]
struct DetailBody<'a> {
    detail: &'a str,
}

#[derive(Serialize)]
struct ViolationsBody<'a> {
    detail: &'a [FieldViolation],
}

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: &CorrelationId) -> Self {
        match &error {
            ApplicationError::Internal(detail) | ApplicationError::Dispatch(detail) => error!(
                event_name = "vapi.request.failed",
                correlation_id = %correlation_id,
                error = %detail,
                "request failed after validation"
            ),
            ApplicationError::Validation(_) | ApplicationError::Domain(_) => warn!(
                event_name = "vapi.request.rejected",
                correlation_id = %correlation_id,
                error = %error,
                "request rejected before forwarding"
            ),
        }
        Self(error.into_interface(correlation_id.as_str()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            InterfaceError::Unprocessable { violations, .. } => {
                (status, Json(ViolationsBody { detail: violations })).into_response()
            }
            InterfaceError::BadRequest { message, .. } | InterfaceError::Internal { message, .. } => {
                (status, Json(DetailBody { detail: message })).into_response()
            }
        }
    }
}
