//! End-to-end route tests.
//!
//! Drives the real router in-process and swaps the CRM for an adapter that
//! records every forwarding call, so each test can assert exactly which
//! calls were made and in what order.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use mainline_core::config::AppConfig;
use mainline_core::{CallStartPayload, CrmAdapter, EmailAddress, FieldMap};
use mainline_server::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Clone, Debug, PartialEq)]
enum CrmCall {
    CallStart { task_id: String, payload: CallStartPayload },
    CallResult(Value),
    ResendInvoice { invoice_number: String, email: String },
    UpdateContact { account_id: Option<String>, account_name: Option<String>, new_contact: Value },
    InboundCall(Value),
}

#[derive(Default)]
struct RecordingCrm {
    calls: Mutex<Vec<CrmCall>>,
    reject_resends: bool,
}

impl RecordingCrm {
    fn rejecting_resends() -> Self {
        Self { reject_resends: true, ..Self::default() }
    }

    fn record(&self, call: CrmCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn calls(&self) -> Vec<CrmCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CrmAdapter for RecordingCrm {
    async fn record_call_start(&self, task_id: &str, payload: &CallStartPayload) {
        self.record(CrmCall::CallStart { task_id: task_id.to_string(), payload: payload.clone() });
    }

    async fn record_call_result(&self, data: FieldMap) {
        self.record(CrmCall::CallResult(Value::Object(data)));
    }

    async fn resend_invoice(&self, invoice_number: &str, email: &EmailAddress) -> bool {
        self.record(CrmCall::ResendInvoice {
            invoice_number: invoice_number.to_string(),
            email: email.to_string(),
        });
        !self.reject_resends
    }

    async fn update_contact(
        &self,
        account_id: Option<&str>,
        account_name: Option<&str>,
        new_contact: FieldMap,
    ) {
        self.record(CrmCall::UpdateContact {
            account_id: account_id.map(str::to_string),
            account_name: account_name.map(str::to_string),
            new_contact: Value::Object(new_contact),
        });
    }

    async fn log_inbound_call(&self, data: FieldMap) {
        self.record(CrmCall::InboundCall(Value::Object(data)));
    }
}

fn app(crm: &Arc<RecordingCrm>) -> Router {
    build_router(crm.clone(), &AppConfig::default().server)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");

    let response = app.oneshot(request).await.expect("execute request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body should be JSON")
    };
    (status, body)
}

#[tokio::test]
async fn call_start_forwards_task_id_and_full_payload() {
    let crm = Arc::new(RecordingCrm::default());
    let body = json!({
        "task_id": "task-123",
        "to_phone": "+15550100",
        "account_name": "Acme",
        "contact": { "name": "Pat", "role": "AP" },
        "invoices": [{ "invoice_number": "INV-1", "amount": 250.75, "days_overdue": 31 }],
        "metadata": { "campaign": "q3-collections" }
    });

    let (status, response) = post_json(app(&crm), "/vapi/call-start", body.clone()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));

    let expected: CallStartPayload = serde_json::from_value(body).expect("valid payload");
    assert_eq!(
        crm.calls(),
        vec![CrmCall::CallStart { task_id: "task-123".to_string(), payload: expected }]
    );
}

#[tokio::test]
async fn call_start_missing_to_phone_is_rejected_before_forwarding() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) =
        post_json(app(&crm), "/vapi/call-start", json!({ "task_id": "task-1" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["detail"][0]["loc"], json!(["body", "to_phone"]));
    assert_eq!(response["detail"][0]["type"], "missing");
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn call_result_without_new_contact_only_records_the_result() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) =
        post_json(app(&crm), "/vapi/call-result", json!({ "outcome": "no_answer" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));
    assert_eq!(
        crm.calls(),
        vec![CrmCall::CallResult(json!({
            "direction": "outbound",
            "outcome": "no_answer",
            "invoices": [],
            "transfer_to_accounting": false,
            "voicemail_left": false
        }))]
    );
}

#[tokio::test]
async fn call_result_with_new_contact_updates_contact_first() {
    let crm = Arc::new(RecordingCrm::default());
    let body = json!({
        "task_id": "task-9",
        "outcome": "connected_wrong_person",
        "new_contact": { "name": "Jordan", "email": "jordan@acme.com", "phone": null },
        "notes": "",
        "voicemail_left": false
    });

    let (status, _) = post_json(app(&crm), "/vapi/call-result", body).await;

    assert_eq!(status, StatusCode::OK);
    let calls = crm.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        CrmCall::UpdateContact {
            account_id: None,
            account_name: None,
            new_contact: json!({ "name": "Jordan", "email": "jordan@acme.com" }),
        }
    );

    let CrmCall::CallResult(data) = &calls[1] else {
        panic!("second call should record the result, got {:?}", calls[1]);
    };
    assert_eq!(data["task_id"], "task-9");
    assert_eq!(data["notes"], "", "explicit empty strings are retained");
    assert_eq!(data["new_contact"], json!({ "name": "Jordan", "email": "jordan@acme.com" }));
    for absent in ["call_id", "outcome_detail", "promise_date", "confirmed_email", "raw"] {
        assert!(data.get(absent).is_none(), "`{absent}` was not supplied and must be dropped");
    }
}

#[tokio::test]
async fn call_result_rejects_outcomes_outside_the_fixed_set() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) =
        post_json(app(&crm), "/vapi/call-result", json!({ "outcome": "hung_up" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["detail"][0]["loc"], json!(["body", "outcome"]));
    assert_eq!(response["detail"][0]["type"], "enum");
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn call_result_with_invalid_confirmed_email_is_rejected() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) = post_json(
        app(&crm),
        "/vapi/call-result",
        json!({ "outcome": "needs_invoice_resent", "confirmed_email": "ap-at-acme" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["detail"][0]["loc"], json!(["body", "confirmed_email"]));
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn resend_invoice_acknowledges_accepted_dispatch() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) = post_json(
        app(&crm),
        "/vapi/resend-invoice",
        json!({ "invoice_number": "INV-77", "email": "ap@acme.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));
    assert_eq!(
        crm.calls(),
        vec![CrmCall::ResendInvoice {
            invoice_number: "INV-77".to_string(),
            email: "ap@acme.com".to_string(),
        }]
    );
}

#[tokio::test]
async fn resend_invoice_dispatch_failure_returns_server_error() {
    let crm = Arc::new(RecordingCrm::rejecting_resends());

    let (status, response) = post_json(
        app(&crm),
        "/vapi/resend-invoice",
        json!({ "invoice_number": "INV-404", "email": "ap@acme.com", "requested_by": "agent" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({ "detail": "Failed to resend invoice" }));
    assert!(response.get("status").is_none());
    assert_eq!(crm.calls().len(), 1, "the dispatch was attempted exactly once");
}

#[tokio::test]
async fn update_contact_with_account_name_succeeds() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) = post_json(
        app(&crm),
        "/vapi/update-contact",
        json!({ "account_name": "Acme", "new_contact": { "phone": "555-1212" } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));
    assert_eq!(
        crm.calls(),
        vec![CrmCall::UpdateContact {
            account_id: None,
            account_name: Some("Acme".to_string()),
            new_contact: json!({ "phone": "555-1212" }),
        }]
    );
}

#[tokio::test]
async fn update_contact_without_account_identifier_is_a_client_error() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) = post_json(
        app(&crm),
        "/vapi/update-contact",
        json!({ "new_contact": { "phone": "555-1212" } }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({ "detail": "Missing account identifier" }));
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn update_contact_with_only_empty_identifiers_is_a_client_error() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, _) = post_json(
        app(&crm),
        "/vapi/update-contact",
        json!({ "account_id": "", "account_name": "", "new_contact": {} }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn inbound_log_forwards_only_supplied_fields() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, _) = post_json(
        app(&crm),
        "/vapi/inbound-log",
        json!({
            "from_phone": "+15550199",
            "reason": "question about invoice",
            "invoices": [{ "invoice_number": "INV-5", "amount": 12 }],
            "callback_preference": { "preferred_date": "2024-07-02", "timezone": null }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        crm.calls(),
        vec![CrmCall::InboundCall(json!({
            "from_phone": "+15550199",
            "reason": "question about invoice",
            "invoices": [{ "invoice_number": "INV-5", "amount": 12.0 }],
            "callback_preference": { "preferred_date": "2024-07-02" }
        }))]
    );
}

#[tokio::test]
async fn malformed_json_is_reported_as_body_validation_failure() {
    let crm = Arc::new(RecordingCrm::default());
    let request = Request::builder()
        .method("POST")
        .uri("/vapi/inbound-log")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"from_phone\": "))
        .expect("build request");

    let response = app(&crm).oneshot(request).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["detail"][0]["loc"], json!(["body"]));
    assert_eq!(body["detail"][0]["type"], "json_invalid");
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn every_missing_required_field_is_reported() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) = post_json(app(&crm), "/vapi/call-start", json!({})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response["detail"],
        json!([
            { "loc": ["body", "task_id"], "msg": "missing field `task_id`", "type": "missing" },
            { "loc": ["body", "to_phone"], "msg": "missing field `to_phone`", "type": "missing" }
        ])
    );
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn invalid_and_missing_fields_are_reported_together() {
    let crm = Arc::new(RecordingCrm::default());

    let (status, response) =
        post_json(app(&crm), "/vapi/resend-invoice", json!({ "email": "bad" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let locs: Vec<&Value> = response["detail"]
        .as_array()
        .expect("violation list")
        .iter()
        .map(|violation| &violation["loc"])
        .collect();
    assert_eq!(locs, vec![&json!(["body", "email"]), &json!(["body", "invoice_number"])]);
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected_before_validation() {
    let crm = Arc::new(RecordingCrm::default());
    let mut server = AppConfig::default().server;
    server.max_body_bytes = 64;
    let router = build_router(crm.clone(), &server);

    let body = json!({ "from_phone": "+15550199", "notes": "x".repeat(256) });
    let request = Request::builder()
        .method("POST")
        .uri("/vapi/inbound-log")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");

    let response = router.oneshot(request).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn body_without_json_content_type_is_a_validation_failure() {
    let crm = Arc::new(RecordingCrm::default());
    let request = Request::builder()
        .method("POST")
        .uri("/vapi/inbound-log")
        .body(Body::from(json!({ "from_phone": "+15550199" }).to_string()))
        .expect("build request");

    let response = app(&crm).oneshot(request).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["detail"][0]["loc"], json!(["body"]));
    assert_eq!(body["detail"][0]["type"], "json_invalid");
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn health_is_ok_and_independent_of_the_adapter() {
    let crm = Arc::new(RecordingCrm::rejecting_resends());
    let request = Request::builder().uri("/health").body(Body::empty()).expect("build request");

    let response = app(&crm).oneshot(request).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body, json!({ "status": "ok" }));
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn caller_correlation_id_is_echoed() {
    let crm = Arc::new(RecordingCrm::default());
    let request = Request::builder()
        .uri("/health")
        .header("x-correlation-id", "vapi-call-42")
        .body(Body::empty())
        .expect("build request");

    let response = app(&crm).oneshot(request).await.expect("execute request");

    assert_eq!(
        response.headers().get("x-correlation-id").and_then(|value| value.to_str().ok()),
        Some("vapi-call-42")
    );
}
